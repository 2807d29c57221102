//! Remote debugging protocol surface used by the app manager
//!
//! Packets are JSON objects addressed to an actor (`{"to": actor, "type": ...}`);
//! their wire encoding belongs to the [`ProtocolClient`] implementation.

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use webide_core::prelude::*;

/// Low-level request/response client of a connection.
pub trait ProtocolClient: Send + Sync + fmt::Debug {
    /// Root `listTabs` request.
    fn list_tabs(&self) -> BoxFuture<'_, Result<ListTabsResponse>>;

    /// Send a packet and wait for the actor's reply.
    fn request(&self, packet: Value) -> BoxFuture<'_, Result<Value>>;
}

/// Root actor reply to `listTabs`: the tabs plus the global actors the
/// runtime exposes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTabsResponse {
    #[serde(default)]
    pub from: Option<String>,

    #[serde(default)]
    pub tabs: Vec<Value>,

    #[serde(default)]
    pub selected: Option<usize>,

    /// Apps management actor; absent on runtimes that can't handle apps
    #[serde(default)]
    pub webapps_actor: Option<String>,

    /// Console actor of the main process; present when it is debuggable
    #[serde(default)]
    pub console_actor: Option<String>,

    #[serde(default)]
    pub device_actor: Option<String>,

    #[serde(default)]
    pub preference_actor: Option<String>,

    #[serde(default)]
    pub settings_actor: Option<String>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl ListTabsResponse {
    pub fn has_apps_actor(&self) -> bool {
        self.webapps_actor.is_some()
    }

    /// The response as a raw form, as used to build chrome targets.
    pub fn to_form(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A debuggable target (tab-like actor form) a toolbox can attach to.
#[derive(Clone)]
pub struct Target {
    pub form: Value,
    /// Whether the target is the privileged main process
    pub chrome: bool,
    client: Arc<dyn ProtocolClient>,
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("form", &self.form)
            .field("chrome", &self.chrome)
            .finish()
    }
}

impl Target {
    pub fn new(form: Value, client: Arc<dyn ProtocolClient>, chrome: bool) -> Self {
        Self {
            form,
            chrome,
            client,
        }
    }

    /// Actor id of the target, if the form carries one.
    pub fn actor(&self) -> Option<&str> {
        self.form.get("actor").and_then(Value::as_str)
    }

    pub fn client(&self) -> &Arc<dyn ProtocolClient> {
        &self.client
    }

    /// Ask the target to reload its document.
    pub async fn reload(&self) -> Result<()> {
        let actor = self
            .actor()
            .ok_or_else(|| Error::protocol("target form has no actor"))?
            .to_string();
        self.client
            .request(json!({ "to": actor, "type": "reload" }))
            .await?;
        Ok(())
    }
}

/// Global actor fronts reachable from the `listTabs` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontKind {
    Device,
    Preference,
    Settings,
}

impl FrontKind {
    fn actor_in<'a>(&self, response: &'a ListTabsResponse) -> Option<&'a str> {
        match self {
            FrontKind::Device => response.device_actor.as_deref(),
            FrontKind::Preference => response.preference_actor.as_deref(),
            FrontKind::Settings => response.settings_actor.as_deref(),
        }
    }
}

/// Thin front over one of the runtime's global actors.
#[derive(Clone)]
pub struct ActorFront {
    pub kind: FrontKind,
    pub actor: String,
    client: Arc<dyn ProtocolClient>,
}

impl fmt::Debug for ActorFront {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorFront")
            .field("kind", &self.kind)
            .field("actor", &self.actor)
            .finish()
    }
}

impl ActorFront {
    /// Build the front for `kind`, if the runtime advertised that actor.
    pub fn from_response(
        kind: FrontKind,
        client: Arc<dyn ProtocolClient>,
        response: &ListTabsResponse,
    ) -> Option<Self> {
        kind.actor_in(response).map(|actor| Self {
            kind,
            actor: actor.to_string(),
            client,
        })
    }

    /// Send `method` to the actor with extra packet fields from `params`.
    pub async fn request(&self, method: &str, params: Option<Map<String, Value>>) -> Result<Value> {
        let mut packet = params.unwrap_or_default();
        packet.insert("to".to_string(), Value::String(self.actor.clone()));
        packet.insert("type".to_string(), Value::String(method.to_string()));
        self.client.request(Value::Object(packet)).await
    }
}
