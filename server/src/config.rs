//! Server configuration from the environment

use std::path::PathBuf;

use tasklist_core::store::CollectionRef;

const DEFAULT_DATA_DIR: &str = ".tasklist-data";
const DEFAULT_COLLECTION: &str = "tasks";
const DEFAULT_HTTP_PORT: u16 = 8081;
const DEFAULT_SOCKET_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub data_dir: PathBuf,
    pub collection: CollectionRef,
    pub http_port: u16,
    pub socket_port: u16,
    /// Keep documents in a JSON file under `data_dir`
    pub persist: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            collection: CollectionRef::new(DEFAULT_COLLECTION),
            http_port: DEFAULT_HTTP_PORT,
            socket_port: DEFAULT_SOCKET_PORT,
            persist: true,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            data_dir: lookup("TASKLIST_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            collection: lookup("TASKLIST_COLLECTION")
                .filter(|name| !name.trim().is_empty())
                .map(CollectionRef::new)
                .unwrap_or(defaults.collection),
            http_port: parse_port(lookup("TASKLIST_HTTP_PORT"), defaults.http_port),
            socket_port: parse_port(lookup("TASKLIST_SOCKET_PORT"), defaults.socket_port),
            persist: parse_flag(lookup("TASKLIST_PERSIST"), defaults.persist),
        }
    }

    /// Location of the document file when `persist` is on
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("documents.json")
    }
}

fn parse_port(raw: Option<String>, default: u16) -> u16 {
    raw.and_then(|raw| raw.trim().parse().ok()).unwrap_or(default)
}

fn parse_flag(raw: Option<String>, default: bool) -> bool {
    match raw {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        None => default,
    }
}
