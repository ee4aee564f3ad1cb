//! Wiring of one house: listener, peer link, coordinator and timer pump.

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Instrument};

use crate::auction::AuctionHouse;
use crate::config::{HouseSettings, ItemSpec, Role};
use crate::error::HouseResult;
use crate::net::{Multiplexer, PeerLink, SharedHouse, TokioTimers};
use crate::traits::{TimerTicket, WinnerStore};

/// Everything needed to start one house.
pub struct HouseOptions {
    pub role: Role,
    /// Address the bidder listener binds to.
    pub listen: String,
    pub peer: PeerLink,
    pub settings: HouseSettings,
    pub items: Vec<ItemSpec>,
    pub store: Arc<dyn WinnerStore>,
}

/// A house whose listener is bound but whose auction has not started.
pub struct HouseServer {
    role: Role,
    peer: PeerLink,
    settings: HouseSettings,
    items: Vec<ItemSpec>,
    store: Arc<dyn WinnerStore>,
    mux: Multiplexer,
}

impl HouseServer {
    pub async fn bind(options: HouseOptions) -> HouseResult<Self> {
        let mux = Multiplexer::bind(&options.listen, options.settings.poll_interval).await?;
        info!(
            "{} house listening on {}",
            options.role,
            mux.local_addr()?
        );
        Ok(Self {
            role: options.role,
            peer: options.peer,
            settings: options.settings,
            items: options.items,
            store: options.store,
            mux,
        })
    }

    pub fn local_addr(&self) -> HouseResult<SocketAddr> {
        self.mux.local_addr()
    }

    /// Link with the peer, then run the auction to completion.
    pub async fn run(self, cancel: CancellationToken) -> HouseResult<()> {
        let span = info_span!("house", role = %self.role);
        self.run_inner(cancel).instrument(span).await
    }

    async fn run_inner(mut self, cancel: CancellationToken) -> HouseResult<()> {
        self.mux.connect_peer(&self.peer, &cancel).await?;

        let timer_cancel = cancel.child_token();
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let timers = TokioTimers::new(fired_tx, timer_cancel.clone());
        let house: SharedHouse = Arc::new(Mutex::new(AuctionHouse::new(
            self.role,
            self.settings,
            self.items,
            self.mux.registry(),
            timers,
            self.store,
        )));

        let pump = tokio::spawn(
            pump_timers(house.clone(), fired_rx, timer_cancel.clone()).in_current_span(),
        );
        house.lock().start();

        let result = self.mux.run(house.clone(), cancel.child_token()).await;

        timer_cancel.cancel();
        house.lock().timers().abort_all();
        pump.abort();
        info!("House stopped");
        result
    }
}

/// Deliver fired timer tickets to the coordinator, one lock per ticket.
async fn pump_timers(
    house: SharedHouse,
    mut fired: mpsc::UnboundedReceiver<TimerTicket>,
    cancel: CancellationToken,
) {
    loop {
        let ticket = tokio::select! {
            ticket = fired.recv() => match ticket {
                Some(ticket) => ticket,
                None => break,
            },
            () = cancel.cancelled() => break,
        };
        house.lock().on_timer(ticket);
    }
    debug!("Timer pump stopped");
}
