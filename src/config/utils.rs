use std::collections::HashMap;

/// Parse a transfer map of the form `billing=+15550001,support=+15550002`
///
/// Department names are lowercased. Entries without `=` or with an empty side are
/// rejected.
pub fn parse_transfer_numbers(s: &str) -> Result<HashMap<String, String>, String> {
    let mut numbers = HashMap::new();

    for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((department, number)) = entry.split_once('=') else {
            return Err(format!("Invalid transfer entry '{entry}', expected department=number"));
        };

        let (department, number) = (department.trim(), number.trim());
        if department.is_empty() || number.is_empty() {
            return Err(format!("Invalid transfer entry '{entry}', expected department=number"));
        }
        numbers.insert(department.to_lowercase(), number.to_string());
    }

    Ok(numbers)
}
