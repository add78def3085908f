use anyhow::Result;
use vct_session::suggestions;

use crate::output::print_json;

pub(crate) fn run_suggestions(json_mode: bool) -> Result<()> {
    if json_mode {
        return print_json(&suggestions());
    }
    for (i, prompt) in suggestions().iter().enumerate() {
        println!("{}. {prompt}", i + 1);
    }
    Ok(())
}
