//! Version command

use console::style;
use stevedore_convert::tool_version;

pub fn run() {
    println!("{} {}", style("stevedore").bold(), tool_version());
}
