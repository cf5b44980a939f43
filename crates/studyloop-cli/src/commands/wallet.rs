use serde_json::json;

use super::{open_lifecycle, print_json, CommandResult};

pub fn run() -> CommandResult {
    let lifecycle = open_lifecycle()?;
    let profile = lifecycle.wallet().profile()?;
    print_json(&json!({ "coins": profile.coins }))
}
