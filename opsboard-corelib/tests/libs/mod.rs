use std::{env, ffi::OsStr};

use tokio::runtime::Runtime;

use crate::TestState;


pub fn new_state() -> TestState {
    TestState {
        runtime: Some(Runtime::new().unwrap()),
    }
}

fn set_env_var(key: &str, val: &str) {
    unsafe {
        env::set_var(&OsStr::new(key), val);
    }
}

fn remove_env_var(key: &str) {
    unsafe {
        env::remove_var(&OsStr::new(key));
    }
}
