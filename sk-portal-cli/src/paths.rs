use directories::ProjectDirs;
use std::path::PathBuf;

pub fn project_dirs() -> ProjectDirs {
    ProjectDirs::from("", "", "sk-portal")
        .expect("Couldn't find operating-system-specific configuration paths")
}

pub fn config_file() -> PathBuf {
    project_dirs().config_dir().join("config.toml")
}

pub fn default_session_file() -> PathBuf {
    project_dirs().data_dir().join("pending-session.json")
}
