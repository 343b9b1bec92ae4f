//! Channel membership prefixes: op (`@`), halfop (`%`) and voice (`+`)

use modeircd_core::mode::{HALFOP_VALUE, OP_VALUE, VOICE_VALUE};
use modeircd_core::{ModeHandler, Module, Result, Server};
use std::sync::Arc;

/// Provides `+o`, `+h` and `+v`
#[derive(Debug)]
pub struct PrefixModesModule {
    halfop: bool,
}

impl Default for PrefixModesModule {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefixModesModule {
    pub fn new() -> Self {
        Self { halfop: true }
    }

    /// Without halfop, only op and voice are registered
    pub fn without_halfop() -> Self {
        Self { halfop: false }
    }
}

impl Module for PrefixModesModule {
    fn name(&self) -> &str {
        "prefixes"
    }

    fn description(&self) -> &str {
        "Provides the channel membership prefix modes +ohv"
    }

    fn init(&self, server: &mut Server) -> Result<()> {
        server
            .modes
            .add_mode(Arc::new(ModeHandler::prefix(self.name(), "op", 'o', OP_VALUE, '@')))?;

        if self.halfop {
            server.modes.add_mode(Arc::new(
                ModeHandler::prefix(self.name(), "halfop", 'h', HALFOP_VALUE, '%')
                    .with_prefix_ranks(OP_VALUE, OP_VALUE),
            ))?;
        }

        server.modes.add_mode(Arc::new(
            ModeHandler::prefix(self.name(), "voice", 'v', VOICE_VALUE, '+')
                .with_prefix_ranks(HALFOP_VALUE, HALFOP_VALUE),
        ))?;
        Ok(())
    }
}
