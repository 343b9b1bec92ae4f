//! Rust IRC Daemon Modules
//!
//! Standard channel and user modes built on the core mode engine.

pub mod banredirect;
pub mod chanmodes;
pub mod listmodes;
pub mod prefixes;
pub mod rmode;
pub mod usermodes;

pub use banredirect::BanRedirectModule;
pub use chanmodes::ChannelModesModule;
pub use listmodes::ListModesModule;
pub use prefixes::PrefixModesModule;
pub use rmode::RemoveModeModule;
pub use usermodes::UserModesModule;

use modeircd_core::{Error, Module, Result, Server};
use std::sync::Arc;
use tracing::info;

/// Look up a bundled module by name
pub fn standard_module(name: &str) -> Option<Arc<dyn Module>> {
    let module: Arc<dyn Module> = match name {
        "banredirect" => Arc::new(BanRedirectModule::new()),
        "chanmodes" => Arc::new(ChannelModesModule::new()),
        "listmodes" => Arc::new(ListModesModule::new()),
        "prefixes" => Arc::new(PrefixModesModule::new()),
        "rmode" => Arc::new(RemoveModeModule::new()),
        "usermodes" => Arc::new(UserModesModule::new()),
        _ => return None,
    };
    Some(module)
}

/// Load every module listed in the server configuration, in order
pub fn load_configured(server: &mut Server) -> Result<()> {
    let names = server.config().modules.load.clone();
    for name in &names {
        let module = standard_module(name)
            .ok_or_else(|| Error::Module(format!("Unknown module: {}", name)))?;
        server.load_module(module)?;
        info!("Loaded module {}", name);
    }
    Ok(())
}
