//! Operations context for dependency injection

use plaudit_audit::{AuditTool, CommandAuditTool};
use plaudit_config::Config;
use plaudit_errors::{Error, OpsError};
use plaudit_events::EventSender;
use plaudit_net::{NetClient, NetConfig};
use plaudit_resolver::RepositoryResolver;
use plaudit_store::CacheLayout;
use std::path::PathBuf;
use std::sync::Arc;

/// Operations context providing access to all system components
pub struct OpsCtx {
    /// Cache directory layout
    pub layout: CacheLayout,
    /// Network client
    pub net: NetClient,
    /// Repository host lookups
    pub resolver: RepositoryResolver,
    /// External audit tool
    pub audit_tool: Arc<dyn AuditTool>,
    /// Event sender for progress reporting
    pub tx: EventSender,
    /// System configuration
    pub config: Config,
}

/// Builder for the operations context
pub struct OpsContextBuilder {
    net: Option<NetClient>,
    audit_tool: Option<Arc<dyn AuditTool>>,
    cache_dir: Option<PathBuf>,
    tx: Option<EventSender>,
    config: Option<Config>,
}

impl OpsContextBuilder {
    /// Create new context builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            net: None,
            audit_tool: None,
            cache_dir: None,
            tx: None,
            config: None,
        }
    }

    /// Set network client (built from the configuration otherwise)
    #[must_use]
    pub fn with_net(mut self, net: NetClient) -> Self {
        self.net = Some(net);
        self
    }

    /// Set audit tool (the configured command otherwise)
    #[must_use]
    pub fn with_audit_tool(mut self, tool: Arc<dyn AuditTool>) -> Self {
        self.audit_tool = Some(tool);
        self
    }

    /// Override the cache directory from the configuration
    #[must_use]
    pub fn with_cache_dir(mut self, dir: PathBuf) -> Self {
        self.cache_dir = Some(dir);
        self
    }

    /// Set event sender
    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Set configuration
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the context
    ///
    /// # Errors
    ///
    /// Returns an error if the event sender or configuration is missing, or
    /// if the default network client cannot be created.
    pub fn build(self) -> Result<OpsCtx, Error> {
        let tx = self.tx.ok_or_else(|| OpsError::MissingComponent {
            component: "event_sender".to_string(),
        })?;

        let config = self.config.ok_or_else(|| OpsError::MissingComponent {
            component: "config".to_string(),
        })?;

        let net = match self.net {
            Some(net) => net,
            None => NetClient::new(NetConfig::from(&config.network))?,
        };

        let audit_tool = self
            .audit_tool
            .unwrap_or_else(|| Arc::new(CommandAuditTool::from_config(&config.audit)));

        let layout = CacheLayout::new(self.cache_dir.unwrap_or_else(|| config.cache_dir()));
        let resolver = RepositoryResolver::new(net.clone(), config.network.api_base.clone());

        Ok(OpsCtx {
            layout,
            net,
            resolver,
            audit_tool,
            tx,
            config,
        })
    }
}

impl Default for OpsContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
