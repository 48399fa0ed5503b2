//! Instrument bootstrap: connect, load every instrument, disconnect.
//!
//! The async work runs on a current-thread runtime that lives only for the
//! duration of [`bootstrap_instruments`]; no global runtime is installed.

use tracing::{info, warn};

use crate::domain::error::SpotrunnerError;
use crate::domain::instrument::InstrumentCatalog;
use crate::ports::exchange_port::ExchangePort;

/// Load the full catalog over an already-constructed client.
///
/// Once `connect` succeeds, `disconnect` is always called, including when
/// loading fails. A load error takes precedence over a disconnect error.
pub async fn load_catalog<E: ExchangePort>(
    client: &mut E,
) -> Result<InstrumentCatalog, SpotrunnerError> {
    client.connect().await?;

    let loaded = client.load_instruments().await;
    let closed = client.disconnect().await;

    let instruments = match (loaded, closed) {
        (Ok(instruments), Ok(())) => instruments,
        (Ok(_), Err(e)) => return Err(e),
        (Err(e), Ok(())) => return Err(e),
        (Err(load_err), Err(close_err)) => {
            warn!(error = %close_err, "disconnect failed after load error");
            return Err(load_err);
        }
    };

    let catalog: InstrumentCatalog = instruments.into_iter().collect();
    info!(count = catalog.count(), "instruments loaded");
    Ok(catalog)
}

/// Run [`load_catalog`] to completion on a dedicated runtime and block until done.
pub fn bootstrap_instruments<E: ExchangePort>(
    client: &mut E,
) -> Result<InstrumentCatalog, SpotrunnerError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(load_catalog(client))
}
