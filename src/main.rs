use std::sync::Arc;
use tracing::{error, info, warn};

use talentchain_sync::config::Config;
use talentchain_sync::domain::{GovernanceFacade, PoolsFacade, ReputationFacade, SkillsFacade};
use talentchain_sync::transaction::TransactionOrchestrator;
use talentchain_sync::transport::TransportClient;
use talentchain_sync::wallet::{
	ExtensionBridgeProvider, FileSessionStore, PairingProvider, SessionEvent, WalletSessionManager,
};

#[tokio::main(flavor = "current_thread")]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::from_default_env()
				.add_directive(tracing::Level::INFO.into()),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	info!("Starting talentchain sync client");

	let config = match Config::from_env() {
		Ok(config) => config,
		Err(e) => {
			error!("Failed to load configuration: {e}");
			return;
		}
	};

	let transport = TransportClient::new(&config.api_url);
	let store = Arc::new(FileSessionStore::new(config.session_file.clone()));

	let sessions = Arc::new(
		WalletSessionManager::new(config.network, store)
			.with_provider(Arc::new(ExtensionBridgeProvider::hashpack(
				&config.hashpack_bridge_url,
			)))
			.with_provider(Arc::new(ExtensionBridgeProvider::blade(
				&config.blade_bridge_url,
			)))
			.with_provider(Arc::new(PairingProvider::new(
				&config.walletconnect_bridge_url,
			))),
	);

	let _session_log = sessions.subscribe(|event| match event {
		SessionEvent::Connected { session } => {
			info!(provider = %session.provider, account = %session.account, "session connected");
		}
		SessionEvent::Disconnected { account } => {
			info!(account = ?account, "session disconnected");
		}
		SessionEvent::ConnectionFailed { provider, reason } => {
			warn!(%provider, "connection failed: {reason}");
		}
		SessionEvent::Connecting { .. } => {}
	});

	let orchestrator = Arc::new(TransactionOrchestrator::new(
		sessions.clone(),
		transport.clone(),
		config.finality,
	));
	let _tx_log = orchestrator.subscribe(|record| {
		info!(request_id = %record.request_id, state = ?record.state, "transaction update");
	});

	let skills = SkillsFacade::new(transport.clone(), orchestrator.clone(), &sessions);
	let pools = PoolsFacade::new(transport.clone(), orchestrator.clone());
	let governance = GovernanceFacade::new(transport.clone(), orchestrator.clone());
	let reputation = ReputationFacade::new(transport, &sessions);

	// Revalidation tasks run for the life of the process.
	let interval = config.revalidation_interval;
	tokio::spawn({
		let skills = skills.clone();
		async move { skills.run_revalidation(interval).await }
	});
	tokio::spawn({
		let pools = pools.clone();
		async move { pools.run_revalidation(interval).await }
	});
	tokio::spawn({
		let governance = governance.clone();
		async move { governance.run_revalidation(interval).await }
	});
	tokio::spawn({
		let reputation = reputation.clone();
		async move { reputation.run_revalidation(interval).await }
	});

	match sessions.restore_session().await {
		Some(session) => {
			info!(account = %session.account, "restored persisted session");
			match reputation.reputation(&session.account).await {
				Ok(read) => info!(score = read.value.score, stale = read.stale, "reputation"),
				Err(e) => warn!("reputation fetch failed: {e}"),
			}
		}
		None => info!("no persisted session; reads are anonymous until connect"),
	}

	match pools.list_pools().await {
		Ok(read) => info!(pools = read.value.len(), stale = read.stale, "talent pools"),
		Err(e) => warn!("pool listing failed: {e}"),
	}

	match governance.active_proposals().await {
		Ok(read) => info!(proposals = read.value.len(), "active governance proposals"),
		Err(e) => warn!("proposal listing failed: {e}"),
	}
}
