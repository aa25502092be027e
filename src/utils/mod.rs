pub mod req_manager;
