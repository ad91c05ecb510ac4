use serde_json::{Value, json};

/// Discord option type of a string argument.
const STRING_OPTION: u8 = 3;

/// Slash commands registered for the bot application.
pub fn command_definitions() -> Vec<Value> {
    vec![
        json!({
            "name": "shell",
            "description": "Run a shell command",
            "options": [{
                "type": STRING_OPTION,
                "name": "command",
                "description": "The command to run",
                "required": true,
            }],
        }),
        simple("start", "Starting worker containers"),
        simple("stop", "Stopping worker containers"),
        simple("restart", "Restart worker containers"),
        simple("pause", "Pause worker containers"),
        simple("resume", "Resume worker containers"),
        simple("status", "Get the status of worker containers"),
    ]
}

fn simple(name: &str, description: &str) -> Value {
    json!({ "name": name, "description": description })
}
