//! Flow configuration.
//!
//! A flow is a JSON document listing handler nodes and how their outlets are
//! wired to other nodes' inputs:
//!
//! ```json
//! {
//!   "nodes": [
//!     { "id": "app", "type": "voice-application", "applicationKey": "k", "applicationSecret": "s" },
//!     { "id": "in", "type": "voice-incoming-call", "endpoint": "+1555", "wires": [["menu"]] },
//!     { "id": "menu", "type": "voice-answered-call-event", "svaml": "..." }
//!   ]
//! }
//! ```
//!
//! `wires[i]` lists the nodes fed by outlet `i`; each of them receives the
//! outlet's notifications independently. Outgoing calls have two outlets
//! (success, failure); every other kind has one. Digit menus, answered
//! suppliers and outgoing calls accept input; an outgoing call places a new
//! call for every notification it receives.

use crate::{
    callout::CalloutClient,
    handler::{
        AnsweredCallEvent, AnsweredConfig, Application, ApplicationConfig, DtmfConfig, DtmfMenu,
        HandlerInstance, IncomingCall, IncomingConfig, OutgoingCall, OutgoingConfig,
    },
    outlet::Outlet,
    registry::HandlerRegistry,
};
use serde::Deserialize;
use std::{collections::HashMap, sync::Arc, time::Duration};
use voxroute_core::{ConfigError, HandlerId, HandlerKind, SessionStore};
use voxroute_std::store::MemoryStore;

/// A deployed flow.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlowConfig {
    /// Handler nodes in registration order.
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
}

/// One handler node.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Node id, unique within the flow.
    pub id: String,
    /// Outlet index to target node ids.
    #[serde(default)]
    pub wires: Vec<Vec<String>>,
    /// Kind specific settings.
    #[serde(flatten)]
    pub spec: NodeSpec,
}

/// Kind specific node settings, tagged by `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum NodeSpec {
    /// Coordinating application.
    #[serde(rename = "voice-application")]
    Application(ApplicationConfig),
    /// Incoming call receiver.
    #[serde(rename = "voice-incoming-call")]
    Incoming(IncomingConfig),
    /// Call originator.
    #[serde(rename = "voice-call")]
    Outgoing(OutgoingConfig),
    /// Digit menu action.
    #[serde(rename = "voice-dtmf")]
    Dtmf(DtmfConfig),
    /// Answered call markup supplier.
    #[serde(rename = "voice-answered-call-event")]
    AnsweredEvent(AnsweredConfig),
}

impl NodeSpec {
    /// Handler kind the node builds.
    pub fn kind(&self) -> HandlerKind {
        match self {
            NodeSpec::Application(_) => HandlerKind::Application,
            NodeSpec::Incoming(_) => HandlerKind::Incoming,
            NodeSpec::Outgoing(_) => HandlerKind::Outgoing,
            NodeSpec::Dtmf(_) => HandlerKind::Digit,
            NodeSpec::AnsweredEvent(_) => HandlerKind::AnsweredEvent,
        }
    }
}

impl FlowConfig {
    /// Parse a flow document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build every node, wire outlets to inputs and load the result into a
    /// fresh registry.
    ///
    /// `sessions` supplies each node's store. Outgoing calls sign with the
    /// application they name, or the first one when they name none.
    pub fn build_registry(
        &self,
        client: Arc<dyn CalloutClient>,
        sessions: impl Fn(&HandlerId) -> SessionStore,
    ) -> Result<HandlerRegistry, ConfigError> {
        let registry = HandlerRegistry::new();
        registry.replace_all(self.build(client, sessions)?)?;
        Ok(registry)
    }

    /// [`build_registry`](Self::build_registry) with in-process stores,
    /// expiring entries after `ttl` when given.
    pub fn build_in_memory(
        &self,
        client: Arc<dyn CalloutClient>,
        ttl: Option<Duration>,
    ) -> Result<HandlerRegistry, ConfigError> {
        self.build_registry(client, |_| match ttl {
            Some(ttl) => SessionStore::new(MemoryStore::with_ttl(ttl)),
            None => SessionStore::new(MemoryStore::new()),
        })
    }

    /// Build the handler instances without registering them.
    pub fn build(
        &self,
        client: Arc<dyn CalloutClient>,
        sessions: impl Fn(&HandlerId) -> SessionStore,
    ) -> Result<Vec<HandlerInstance>, ConfigError> {
        let mut applications: Vec<(String, Arc<Application>)> = Vec::new();
        for node in &self.nodes {
            if let NodeSpec::Application(config) = &node.spec {
                let app = Arc::new(Application::new(node.id.as_str(), config.clone()));
                applications.push((node.id.clone(), app));
            }
        }

        let mut built: HashMap<&str, HandlerInstance> = HashMap::new();
        let mut ordered = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let id = HandlerId::from(node.id.as_str());
            let instance = match &node.spec {
                NodeSpec::Application(_) => {
                    match applications.iter().find(|(app_id, _)| *app_id == node.id) {
                        Some((_, app)) => HandlerInstance::Application(app.clone()),
                        None => return Err(invalid(node, "application was not built")),
                    }
                }
                NodeSpec::Incoming(config) => HandlerInstance::Incoming(Arc::new(
                    IncomingCall::new(id.clone(), config.clone(), sessions(&id)),
                )),
                NodeSpec::Outgoing(config) => {
                    let application = if config.application.is_empty() {
                        applications.first()
                    } else {
                        applications
                            .iter()
                            .find(|(app_id, _)| *app_id == config.application)
                    };
                    let Some((_, application)) = application else {
                        return Err(invalid(
                            node,
                            &format!("unknown application {:?}", config.application),
                        ));
                    };
                    HandlerInstance::Outgoing(Arc::new(OutgoingCall::new(
                        id.clone(),
                        config.clone(),
                        application.clone(),
                        client.clone(),
                        sessions(&id),
                    )))
                }
                NodeSpec::Dtmf(config) => HandlerInstance::Dtmf(Arc::new(DtmfMenu::new(
                    id.clone(),
                    config.clone(),
                    sessions(&id),
                ))),
                NodeSpec::AnsweredEvent(config) => HandlerInstance::AnsweredEvent(Arc::new(
                    AnsweredCallEvent::new(id.clone(), config.clone(), sessions(&id)),
                )),
            };
            if built.insert(node.id.as_str(), instance.clone()).is_some() {
                return Err(ConfigError::DuplicateId(node.id.clone()));
            }
            ordered.push(instance);
        }

        for node in &self.nodes {
            let Some(source) = built.get(node.id.as_str()) else {
                continue;
            };
            let outlets = outlets(source);
            if node.wires.len() > outlets.len() {
                return Err(invalid(
                    node,
                    &format!("{} outlets wired, {} available", node.wires.len(), outlets.len()),
                ));
            }
            for (outlet, targets) in outlets.into_iter().zip(&node.wires) {
                for target in targets {
                    let Some(target) = built.get(target.as_str()) else {
                        return Err(invalid(node, &format!("wired to unknown node {target:?}")));
                    };
                    connect(outlet, target).map_err(|reason| invalid(node, &reason))?;
                }
            }
        }

        Ok(ordered)
    }
}

fn invalid(node: &NodeConfig, reason: &str) -> ConfigError {
    ConfigError::InvalidNode {
        id: node.id.clone(),
        reason: reason.to_string(),
    }
}

fn outlets(instance: &HandlerInstance) -> Vec<&Outlet> {
    match instance {
        HandlerInstance::Application(_) => Vec::new(),
        HandlerInstance::Incoming(h) => vec![h.outlet()],
        HandlerInstance::Outgoing(h) => vec![h.success(), h.failure()],
        HandlerInstance::Dtmf(h) => vec![h.outlet()],
        HandlerInstance::AnsweredEvent(h) => vec![h.outlet()],
    }
}

fn connect(outlet: &Outlet, target: &HandlerInstance) -> Result<(), String> {
    match target {
        HandlerInstance::Dtmf(h) => outlet.tap(h.input()),
        HandlerInstance::AnsweredEvent(h) => outlet.tap(h.input()),
        HandlerInstance::Outgoing(h) => outlet.tap(h.input()),
        other => return Err(format!("{} {} accepts no input", other.kind(), other.id())),
    }
    Ok(())
}
