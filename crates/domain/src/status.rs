use serde::{Deserialize, Serialize};

/// Online/offline state of one tool-providing backend service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Online,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub name: String,
    #[serde(default)]
    pub port: Option<u16>,
    pub status: ServiceState,
    #[serde(default)]
    pub tool_count: usize,
    #[serde(default)]
    pub tools: Vec<String>,
}

impl ServiceStatus {
    pub fn is_online(&self) -> bool {
        self.status == ServiceState::Online
    }
}

/// The display view produced by the last status poll.
///
/// Replaced wholesale on every poll; never patched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub services: Vec<ServiceStatus>,
    pub online_count: usize,
    pub total_tools: usize,
    pub engine: Option<String>,
    /// `false` when the status endpoint itself could not be reached.
    pub reachable: bool,
}

impl StatusSnapshot {
    /// Build a snapshot from a successful poll, deriving the counters.
    pub fn from_services(services: Vec<ServiceStatus>, engine: Option<String>) -> Self {
        let online_count = services.iter().filter(|s| s.is_online()).count();
        let total_tools = services.iter().map(|s| s.tool_count).sum();
        Self {
            services,
            online_count,
            total_tools,
            engine,
            reachable: true,
        }
    }

    /// The view shown after a failed poll: every previously known service
    /// is marked offline with no tools.
    pub fn unreachable(previous: &StatusSnapshot) -> Self {
        let services = previous
            .services
            .iter()
            .map(|s| ServiceStatus {
                status: ServiceState::Offline,
                tool_count: 0,
                tools: Vec::new(),
                ..s.clone()
            })
            .collect();
        Self {
            services,
            online_count: 0,
            total_tools: 0,
            engine: previous.engine.clone(),
            reachable: false,
        }
    }

    pub fn all_online(&self) -> bool {
        self.online_count == self.services.len()
    }
}
