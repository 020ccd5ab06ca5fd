//!
//! Implements the [`UtxoProcessor`], which ingests node notifications and
//! routes them to the [`UtxoContext`] instances tracking the affected
//! addresses.
//!

use crate::imports::*;
use crate::rpc::{Ctl, ListenerId, Notification, Scope, UtxosChangedNotification, VirtualChainChangedNotification};
use crate::settings::EngineSettings;
use crate::utxo::settings::NetworkParamsMap;
use workflow_core::task::spawn;

pub struct Inner {
    address_to_utxo_context_map: DashMap<Arc<Address>, Vec<UtxoContext>>,
    outgoing: DashMap<TransactionId, OutgoingTransaction>,
    current_daa_score: AtomicU64,
    network_id: Mutex<Option<NetworkId>>,
    network_params: RwLock<NetworkParamsMap>,
    fee_rate: Option<f64>,

    connector: Arc<DynNodeConnector>,
    is_connected: AtomicBool,
    is_running: AtomicBool,
    listener_id: Mutex<Option<ListenerId>>,
    task_ctl: DuplexChannel,
    notification_channel: Channel<Notification>,
    multiplexer: Multiplexer<Box<Events>>,
}

impl Inner {
    fn new(connector: &Arc<DynNodeConnector>, network_id: Option<NetworkId>, network_params: NetworkParamsMap, fee_rate: Option<f64>) -> Self {
        Self {
            address_to_utxo_context_map: DashMap::new(),
            outgoing: DashMap::new(),
            current_daa_score: AtomicU64::new(0),
            network_id: Mutex::new(network_id),
            network_params: RwLock::new(network_params),
            fee_rate,

            connector: connector.clone(),
            is_connected: AtomicBool::new(false),
            is_running: AtomicBool::new(false),
            listener_id: Mutex::new(None),
            task_ctl: DuplexChannel::oneshot(),
            notification_channel: Channel::<Notification>::unbounded(),
            multiplexer: Multiplexer::new(),
        }
    }
}

/// Coordinates the node connection with the set of [`UtxoContext`]s
/// created against it. Cloning yields a handle to the same processor.
#[derive(Clone)]
pub struct UtxoProcessor {
    inner: Arc<Inner>,
}

impl UtxoProcessor {
    pub fn new(connector: &Arc<DynNodeConnector>, network_id: Option<NetworkId>) -> Self {
        UtxoProcessor { inner: Arc::new(Inner::new(connector, network_id, NetworkParamsMap::new(), None)) }
    }

    pub fn try_new_with_settings(connector: &Arc<DynNodeConnector>, settings: &EngineSettings) -> Result<Self> {
        let network_params = settings.network_params_map()?;
        Ok(UtxoProcessor { inner: Arc::new(Inner::new(connector, Some(settings.network_id), network_params, settings.fee_rate)) })
    }

    pub fn connector(&self) -> &Arc<DynNodeConnector> {
        &self.inner.connector
    }

    pub fn multiplexer(&self) -> &Multiplexer<Box<Events>> {
        &self.inner.multiplexer
    }

    /// Fee rate (sompi per gram) configured for generators created
    /// against this processor.
    pub fn fee_rate(&self) -> Option<f64> {
        self.inner.fee_rate
    }

    pub fn set_network_id(&self, network_id: &NetworkId) {
        self.inner.network_id.lock().unwrap().replace(*network_id);
    }

    pub fn network_id(&self) -> Result<NetworkId> {
        (*self.inner.network_id.lock().unwrap()).ok_or(Error::MissingNetworkId)
    }

    pub fn network_params(&self) -> Result<NetworkParams> {
        let network_id = self.network_id()?;
        Ok(self.inner.network_params.read().unwrap().get(&network_id))
    }

    pub fn set_coinbase_transaction_maturity_daa(&self, network_id: &NetworkId, value: u64) -> Result<()> {
        if self.is_running() {
            return Err(Error::ProcessorIsRunning);
        }
        self.inner.network_params.write().unwrap().set_coinbase_transaction_maturity_period_daa(network_id, value)
    }

    pub fn set_user_transaction_maturity_daa(&self, network_id: &NetworkId, value: u64) -> Result<()> {
        if self.is_running() {
            return Err(Error::ProcessorIsRunning);
        }
        self.inner.network_params.write().unwrap().set_user_transaction_maturity_period_daa(network_id, value)
    }

    pub fn current_daa_score(&self) -> u64 {
        self.inner.current_daa_score.load(Ordering::SeqCst)
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_connected.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_running.load(Ordering::SeqCst)
    }

    fn listener_id(&self) -> Option<ListenerId> {
        *self.inner.listener_id.lock().unwrap()
    }

    pub fn contexts_for_address(&self, address: &Address) -> Vec<UtxoContext> {
        self.inner.address_to_utxo_context_map.get(address).map(|contexts| contexts.clone()).unwrap_or_default()
    }

    /// All contexts bound to at least one address, without duplicates.
    pub fn contexts(&self) -> Vec<UtxoContext> {
        let mut ids = AHashSet::new();
        let mut contexts = vec![];
        for entry in self.inner.address_to_utxo_context_map.iter() {
            for context in entry.value().iter() {
                if ids.insert(context.id()) {
                    contexts.push(context.clone());
                }
            }
        }
        contexts
    }

    pub async fn register_addresses(&self, addresses: Vec<Arc<Address>>, utxo_context: &UtxoContext) -> Result<()> {
        addresses.iter().for_each(|address| {
            let mut contexts = self.inner.address_to_utxo_context_map.entry(address.clone()).or_default();
            if !contexts.iter().any(|context| context.id() == utxo_context.id()) {
                contexts.push(utxo_context.clone());
            }
        });

        if let Some(listener_id) = self.listener_id() {
            let addresses = addresses.into_iter().map(|address| (*address).clone()).collect::<Vec<_>>();
            self.connector().start_notify(listener_id, Scope::UtxosChanged(addresses)).await?;
        }

        Ok(())
    }

    pub async fn unregister_addresses(&self, addresses: Vec<Arc<Address>>, utxo_context: &UtxoContext) -> Result<()> {
        let mut released = vec![];
        addresses.iter().for_each(|address| {
            let vacant = match self.inner.address_to_utxo_context_map.get_mut(address) {
                Some(mut contexts) => {
                    contexts.retain(|context| context.id() != utxo_context.id());
                    contexts.is_empty()
                }
                None => false,
            };
            if vacant {
                self.inner.address_to_utxo_context_map.remove(address);
                released.push((**address).clone());
            }
        });

        if let Some(listener_id) = self.listener_id() {
            if !released.is_empty() {
                self.connector().stop_notify(listener_id, Scope::UtxosChanged(released)).await?;
            }
        }

        Ok(())
    }

    pub(crate) fn register_outgoing_transaction(&self, outgoing: &OutgoingTransaction) {
        self.inner.outgoing.insert(outgoing.id(), outgoing.clone());
    }

    pub(crate) fn remove_outgoing_transaction(&self, id: &TransactionId) -> Option<OutgoingTransaction> {
        self.inner.outgoing.remove(id).map(|(_, outgoing)| outgoing)
    }

    pub fn outgoing_transaction(&self, id: &TransactionId) -> Option<OutgoingTransaction> {
        self.inner.outgoing.get(id).map(|outgoing| outgoing.clone())
    }

    pub async fn notify(&self, event: Events) -> Result<()> {
        self.multiplexer()
            .try_broadcast(Box::new(event))
            .map_err(|_| Error::Custom("multiplexer channel error during event broadcast".to_string()))?;
        Ok(())
    }

    pub async fn handle_daa_score_change(&self, current_daa_score: u64) -> Result<()> {
        self.inner.current_daa_score.store(current_daa_score, Ordering::SeqCst);
        self.notify(Events::DaaScoreChange { current_daa_score }).await?;
        for context in self.contexts() {
            context.handle_daa_score_change(current_daa_score).await?;
        }
        Ok(())
    }

    /// Routes entries to every context tracking the entry address,
    /// preserving the order in which contexts are first encountered.
    fn route(&self, entries: Vec<UtxoEntry>) -> Vec<(UtxoContext, Vec<UtxoEntryReference>)> {
        let mut routes: Vec<(UtxoContext, Vec<UtxoEntryReference>)> = vec![];
        for entry in entries {
            let Some(address) = entry.address.clone() else {
                log_warn!("utxo processor: ignoring utxo entry without an address: {}", entry.outpoint);
                continue;
            };
            let contexts = self.contexts_for_address(&address);
            if contexts.is_empty() {
                log_error!("receiving UTXO Changed notification for an unknown address: {}", address);
                continue;
            }
            let entry = UtxoEntryReference::from(entry);
            for context in contexts {
                match routes.iter_mut().find(|(routed, _)| routed.id() == context.id()) {
                    Some((_, entries)) => entries.push(entry.clone()),
                    None => routes.push((context, vec![entry.clone()])),
                }
            }
        }
        routes
    }

    pub async fn handle_utxo_changed(&self, notification: UtxosChangedNotification) -> Result<()> {
        let UtxosChangedNotification { added, removed } = notification;

        // outputs are processed before the inputs they replace
        for (context, entries) in self.route(added) {
            context.handle_utxo_added(entries).await?;
        }

        for (context, entries) in self.route(removed) {
            context.handle_utxo_removed(entries).await?;
        }

        Ok(())
    }

    pub async fn handle_virtual_chain_changed(&self, notification: VirtualChainChangedNotification) -> Result<()> {
        let VirtualChainChangedNotification { removed_chain_block_hashes, accepted_transaction_ids, .. } = notification;

        if !removed_chain_block_hashes.is_empty() {
            let reorged = self
                .inner
                .outgoing
                .iter()
                .filter(|outgoing| outgoing.accepting_block_hash().is_some_and(|hash| removed_chain_block_hashes.contains(&hash)))
                .map(|outgoing| outgoing.clone())
                .collect::<Vec<_>>();

            for outgoing in reorged {
                log_info!("utxo processor: transaction {} has been unaccepted by a chain reorganization", outgoing.id());
                outgoing.clear_acceptance();
                outgoing.originating_context().handle_reorged_transaction(outgoing.id()).await?;
                if let Some(destination) = outgoing.destination_context() {
                    destination.handle_reorged_transaction(outgoing.id()).await?;
                }
            }
        }

        let current_daa_score = self.current_daa_score();
        for accepted in accepted_transaction_ids {
            for id in accepted.accepted_transaction_ids.iter() {
                if let Some(outgoing) = self.outgoing_transaction(id) {
                    outgoing.tag_as_accepted_at_daa_score(current_daa_score, Some(accepted.accepting_block_hash));
                }
            }
        }

        Ok(())
    }

    async fn init_state_from_server(&self) -> Result<()> {
        let server_info = self.connector().get_server_info().await?;

        match self.network_id() {
            Ok(network_id) if network_id != server_info.network_id => {
                return Err(Error::InvalidNetwork { expected: network_id.to_string(), actual: server_info.network_id.to_string() });
            }
            Ok(_) => {}
            Err(_) => self.set_network_id(&server_info.network_id),
        }

        if !server_info.has_utxo_index {
            return Err(Error::MissingUtxoIndex);
        }

        self.inner.current_daa_score.store(server_info.virtual_daa_score, Ordering::SeqCst);

        log_info!(
            "Connected to kaspad: '{}' on '{}';  SYNC: {}  DAA: {}",
            server_info.server_version,
            server_info.network_id,
            server_info.is_synced,
            server_info.virtual_daa_score
        );

        let url = self.connector().url();
        self.notify(Events::Connect { network_id: server_info.network_id, url: url.clone() }).await?;
        self.notify(Events::ServerStatus {
            network_id: server_info.network_id,
            server_version: server_info.server_version,
            is_synced: server_info.is_synced,
            url,
        })
        .await?;

        Ok(())
    }

    async fn handle_connect_impl(&self) -> Result<()> {
        self.init_state_from_server().await?;
        self.register_notification_listener().await?;
        self.inner.is_connected.store(true, Ordering::SeqCst);

        for context in self.contexts() {
            context.reset();
            context.rescan().await?;
        }

        self.notify(Events::UtxoProcStart).await?;
        Ok(())
    }

    pub async fn handle_connect(&self) -> Result<()> {
        if let Err(err) = self.handle_connect_impl().await {
            log_error!("utxo processor: {err}");
            self.notify(Events::UtxoProcError { message: err.to_string() }).await?;
        }
        Ok(())
    }

    pub async fn handle_disconnect(&self) -> Result<()> {
        self.inner.is_connected.store(false, Ordering::SeqCst);
        self.inner.outgoing.clear();
        for context in self.contexts() {
            context.reset();
        }
        self.unregister_notification_listener().await?;

        self.notify(Events::Disconnect { network_id: self.network_id().ok(), url: self.connector().url() }).await?;
        self.notify(Events::UtxoProcStop).await?;
        Ok(())
    }

    async fn register_notification_listener(&self) -> Result<()> {
        let listener_id = self.connector().register_new_listener(self.inner.notification_channel.sender.clone());
        *self.inner.listener_id.lock().unwrap() = Some(listener_id);

        self.connector().start_notify(listener_id, Scope::VirtualDaaScoreChanged).await?;
        self.connector().start_notify(listener_id, Scope::VirtualChainChanged).await?;

        let addresses = self.inner.address_to_utxo_context_map.iter().map(|entry| (**entry.key()).clone()).collect::<Vec<_>>();
        if !addresses.is_empty() {
            self.connector().start_notify(listener_id, Scope::UtxosChanged(addresses)).await?;
        }

        Ok(())
    }

    async fn unregister_notification_listener(&self) -> Result<()> {
        let listener_id = self.inner.listener_id.lock().unwrap().take();
        if let Some(id) = listener_id {
            self.connector().unregister_listener(id).await?;
        }
        Ok(())
    }

    pub async fn handle_notification(&self, notification: Notification) -> Result<()> {
        match notification {
            Notification::VirtualDaaScoreChanged(virtual_daa_score) => {
                self.handle_daa_score_change(virtual_daa_score).await?;
            }
            Notification::UtxosChanged(utxos_changed_notification) => {
                self.handle_utxo_changed(utxos_changed_notification).await?;
            }
            Notification::VirtualChainChanged(virtual_chain_changed_notification) => {
                self.handle_virtual_chain_changed(virtual_chain_changed_notification).await?;
            }
        }

        Ok(())
    }

    /// Starts the processing task. Subsequent calls while the
    /// processor is running have no effect. If the node is connected,
    /// the initial connection is handled before returning and its
    /// failure leaves the processor stopped.
    pub async fn start(&self) -> Result<()> {
        if self.inner.is_running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let this = self.clone();
        let ctl_channel = this.connector().ctl_multiplexer().channel();
        let task_ctl_receiver = self.inner.task_ctl.request.receiver.clone();
        let task_ctl_sender = self.inner.task_ctl.response.sender.clone();
        let notification_receiver = self.inner.notification_channel.receiver.clone();

        if self.connector().is_connected() {
            if let Err(err) = self.handle_connect_impl().await {
                log_error!("utxo processor: {err}");
                self.abort_start().await;
                self.notify(Events::UtxoProcError { message: err.to_string() }).await.ok();
                return Err(err);
            }
        }

        spawn(async move {
            loop {
                select_biased! {
                    msg = ctl_channel.receiver.recv().fuse() => {
                        match msg {
                            Ok(Ctl::Connect) => {
                                this.handle_connect().await.unwrap_or_else(|err| log_error!("{err}"));
                            },
                            Ok(Ctl::Disconnect) => {
                                this.handle_disconnect().await.unwrap_or_else(|err| log_error!("{err}"));
                            },
                            Err(err) => {
                                log_error!("UtxoProcessor: error while receiving ctl message: {err}");
                                log_error!("Suspending UTXO processor...");
                                break;
                            }
                        }
                    },
                    notification = notification_receiver.recv().fuse() => {
                        match notification {
                            Ok(notification) => {
                                if let Err(err) = this.handle_notification(notification).await {
                                    log_error!("error while handling notification: {err}");
                                    this.notify(Events::UtxoProcError { message: err.to_string() }).await.ok();
                                }
                            }
                            Err(err) => {
                                log_error!("notification channel error: {err}");
                                log_error!("Suspending UTXO processor...");
                                break;
                            }
                        }
                    },
                    // drained last so that pending ctl messages and
                    // notifications are handled before shutting down
                    _ = task_ctl_receiver.recv().fuse() => {
                        break;
                    },
                }
            }

            if this.is_connected() {
                this.handle_disconnect().await.unwrap_or_else(|err| log_error!("{err}"));
            }
            this.inner.is_running.store(false, Ordering::SeqCst);
            task_ctl_sender.send(()).await.unwrap_or_else(|err| log_error!("UtxoProcessor: task ctl error: {err}"));
        });

        Ok(())
    }

    /// Reverts the state set up by a rejected initial connection.
    async fn abort_start(&self) {
        self.inner.is_connected.store(false, Ordering::SeqCst);
        for context in self.contexts() {
            context.reset();
        }
        self.unregister_notification_listener().await.unwrap_or_else(|err| log_error!("utxo processor: {err}"));
        self.inner.is_running.store(false, Ordering::SeqCst);
    }

    /// Stops the processing task. Has no effect if the processor
    /// is not running.
    pub async fn stop(&self) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }
        self.inner.task_ctl.signal(()).await.map_err(|err| Error::ChannelError(err.to_string()))?;
        Ok(())
    }
}
