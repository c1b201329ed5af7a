#![allow(dead_code)]

pub use procset_test_utils::builders;
pub use procset_test_utils::fake_process_table::FakeProcessTable;
pub use procset_test_utils::{init_tracing, with_timeout};

#[cfg(unix)]
pub use procset_test_utils::fake_node::FakeNode;
