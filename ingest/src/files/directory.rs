use std::env;
use std::path::{Path, PathBuf};

/// Home directory from `HOME`, falling back to `USERPROFILE` on Windows
fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

/// Where the game usually saves replays, in lookup order
pub fn replay_directory_candidates(home: &Path) -> Vec<PathBuf> {
    vec![
        // macOS
        home.join("Library")
            .join("Application Support")
            .join("Blizzard")
            .join("StarCraft")
            .join("Maps")
            .join("Replays")
            .join("AutoSave"),
        // Windows, Documents
        home.join("Documents").join("Starcraft").join("Maps").join("Replays"),
        // Windows, old installs
        PathBuf::from(r"C:\Program Files (x86)\StarCraft\Maps\Replays"),
        // Windows, OneDrive-synced Documents
        home.join("OneDrive")
            .join("Documents")
            .join("Starcraft")
            .join("Maps")
            .join("Replays"),
    ]
}

/// First existing replay directory for the current user
pub fn default_replay_directory() -> Option<PathBuf> {
    let home = home_dir()?;
    replay_directory_candidates(&home).into_iter().find(|dir| dir.is_dir())
}
