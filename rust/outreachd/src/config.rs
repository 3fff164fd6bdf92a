use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_COORDINATOR_ROLES: [&str; 3] =
    ["Outreach Coordinator", "Coordinator", "System Manager"];

#[derive(Parser, Debug)]
#[command(name = "outreachd")]
#[command(
    about = "Outreach followup sidecar speaking JSON lines over stdin/stdout",
    long_about = None
)]
pub struct Config {
    /// Workspace directory to open at startup
    #[arg(long, env = "OUTREACHD_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Log filter directives, written to stderr
    #[arg(long, env = "OUTREACHD_LOG", default_value = "outreachd=info")]
    pub log: String,

    /// Roles treated as outreach coordinators (repeatable)
    #[arg(
        long = "coordinator-role",
        env = "OUTREACHD_COORDINATOR_ROLES",
        value_delimiter = ',',
        default_values_t = DEFAULT_COORDINATOR_ROLES.map(String::from)
    )]
    pub coordinator_roles: Vec<String>,
}
