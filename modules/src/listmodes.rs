//! Channel list modes: bans, ban exceptions and invite exceptions

use modeircd_core::mode::{ListModeBase, ListNumerics};
use modeircd_core::{ModeHandler, Module, NumericReply, Result, Server};
use std::sync::Arc;

/// Provides `+b`, `+e` and `+I`
#[derive(Debug, Default)]
pub struct ListModesModule;

impl ListModesModule {
    pub fn new() -> Self {
        Self
    }
}

fn list_mode(creator: &str, name: &str, letter: char, numerics: ListNumerics) -> Arc<ModeHandler> {
    Arc::new(ModeHandler::list(creator, name, letter, ListModeBase::new(numerics, true)))
}

impl Module for ListModesModule {
    fn name(&self) -> &str {
        "listmodes"
    }

    fn description(&self) -> &str {
        "Provides the channel list modes +beI"
    }

    fn init(&self, server: &mut Server) -> Result<()> {
        server.modes.add_mode(list_mode(
            self.name(),
            "ban",
            'b',
            ListNumerics {
                entry: NumericReply::RplBanList,
                end: NumericReply::RplEndOfBanList,
                end_text: "End of channel ban list",
            },
        ))?;
        server.modes.add_mode(list_mode(
            self.name(),
            "banexception",
            'e',
            ListNumerics {
                entry: NumericReply::RplExceptList,
                end: NumericReply::RplEndOfExceptList,
                end_text: "End of channel exception list",
            },
        ))?;
        server.modes.add_mode(list_mode(
            self.name(),
            "invex",
            'I',
            ListNumerics {
                entry: NumericReply::RplInviteList,
                end: NumericReply::RplEndOfInviteList,
                end_text: "End of channel invite exception list",
            },
        ))?;
        Ok(())
    }
}
