use std::path::PathBuf;

use clap::Parser;
use lwm2m::update::UpdateConfig;
use lwm2m::ClientConfig;

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Endpoint name presented to the servers. Defaults to an IMEI URN
    /// when --imei is given.
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Bootstrap server URL (`coap://` / `coaps://`), stored on first run.
    #[arg(short, long)]
    pub bootstrap_server: Option<String>,

    /// State directory holding the persisted client blobs.
    #[arg(short, long, default_value = "/var/lib/lwm2m")]
    pub state_dir: PathBuf,

    /// Device IMEI, used for the default endpoint name.
    #[arg(long)]
    pub imei: Option<String>,

    /// Ask before starting package downloads.
    #[arg(long)]
    pub confirm_download: bool,

    /// Ask before installing downloaded packages.
    #[arg(long)]
    pub confirm_install: bool,

    /// How long to drive the session loop before exiting, seconds.
    #[arg(short, long, default_value_t = 30)]
    pub timeout: u16,
}

impl Cli {
    /// The endpoint name, from the flag or derived from the IMEI.
    pub fn endpoint_name(&self) -> Result<String, &'static str> {
        if let Some(endpoint) = &self.endpoint {
            return Ok(endpoint.clone());
        }
        match &self.imei {
            Some(imei) => Ok(format!("urn:imei:{imei}")),
            None => Err("either --endpoint or --imei must be given"),
        }
    }

    pub fn make_client_config(&self) -> Result<ClientConfig, &'static str> {
        Ok(ClientConfig {
            endpoint_name: self.endpoint_name()?,
            update: UpdateConfig {
                require_download_agreement: self.confirm_download,
                require_update_agreement: self.confirm_install,
            },
        })
    }
}
