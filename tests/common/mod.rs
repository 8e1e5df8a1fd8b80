#![allow(dead_code)]

use std::error::Error;

pub use probekit_test_utils::builders::ConfigFileBuilder;
pub use probekit_test_utils::{FlakyOperation, init_tracing, with_deadline, with_timeout};

pub type TestResult = Result<(), Box<dyn Error>>;
