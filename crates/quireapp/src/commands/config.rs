use crate::commands::{CmdMessage, CmdResult, QuirePaths};
use crate::config::EditorSettings;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigAction {
    ShowAll,
    Get(String),
    Set(String, String),
}

pub fn run(paths: &QuirePaths, action: ConfigAction) -> Result<CmdResult> {
    let mut settings = EditorSettings::load(&paths.data)?;
    let mut result = CmdResult::default();
    match action {
        ConfigAction::ShowAll => {
            result.settings = settings.entries()?;
        }
        ConfigAction::Get(key) => {
            let value = settings.get(&key)?;
            result.settings.push((key, value));
        }
        ConfigAction::Set(key, value) => {
            settings.set(&key, &value)?;
            settings.save(&paths.data)?;
            let stored = settings.get(&key)?;
            result.add_message(CmdMessage::success(format!("{} = {}", key, stored)));
        }
    }
    Ok(result)
}
