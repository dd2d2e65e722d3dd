pub mod machine;
pub mod util;
