mod detect;

pub use detect::{DetectArgs, cmd_detect, exit_code};
