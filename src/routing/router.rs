//! Action dispatch module
//!
//! Maps action name × HTTP method to a handler, resolves the action from the
//! request, binds arguments and invokes the handler.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use hyper::Method;

use super::action::Action;
use super::exchange::Exchange;
use super::params::{self, Args, Params};
use super::request::RequestData;
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::logger;

const DEFAULT_ACTION: &str = "index";
const DEFAULT_ACTION_FIELD: &str = "action";
const DEFAULT_MAX_FORWARD_DEPTH: usize = 8;

/// Action registry and dispatcher
pub struct Router {
    handlers: HashMap<String, HashMap<Method, Arc<dyn Action>>>,
    not_found: Option<Arc<dyn Action>>,
    default_action: String,
    action_field: String,
    entry_script: String,
    max_forward_depth: usize,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut actions: Vec<_> = self.handlers.keys().collect();
        actions.sort();
        f.debug_struct("Router")
            .field("actions", &actions)
            .field("has_not_found", &self.not_found.is_some())
            .field("default_action", &self.default_action)
            .field("action_field", &self.action_field)
            .finish_non_exhaustive()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            not_found: None,
            default_action: DEFAULT_ACTION.to_string(),
            action_field: DEFAULT_ACTION_FIELD.to_string(),
            entry_script: String::new(),
            max_forward_depth: DEFAULT_MAX_FORWARD_DEPTH,
        }
    }

    pub fn from_config(app: &AppConfig) -> Self {
        Self {
            default_action: app.default_action.clone(),
            action_field: app.action_field.clone(),
            entry_script: app.entry_script.clone(),
            max_forward_depth: app.max_forward_depth,
            ..Self::new()
        }
    }

    /// Define the default (index) action
    pub fn index(&mut self, action: &str) -> &mut Self {
        self.default_action = action.to_string();
        self
    }

    pub fn get(&mut self, action: &str, handler: impl Action + 'static) -> Result<&mut Self> {
        self.on(action, Method::GET, handler)
    }

    pub fn post(&mut self, action: &str, handler: impl Action + 'static) -> Result<&mut Self> {
        self.on(action, Method::POST, handler)
    }

    pub fn put(&mut self, action: &str, handler: impl Action + 'static) -> Result<&mut Self> {
        self.on(action, Method::PUT, handler)
    }

    pub fn delete(&mut self, action: &str, handler: impl Action + 'static) -> Result<&mut Self> {
        self.on(action, Method::DELETE, handler)
    }

    /// Register a handler for an action under any method
    ///
    /// Re-registering the same pair replaces the previous handler.
    pub fn on(
        &mut self,
        action: &str,
        method: Method,
        handler: impl Action + 'static,
    ) -> Result<&mut Self> {
        if action.is_empty() {
            return Err(Error::EmptyActionName);
        }
        self.handlers
            .entry(action.to_string())
            .or_default()
            .insert(method, Arc::new(handler));
        Ok(self)
    }

    /// Define the fallback for unmatched action/method pairs
    pub fn not_found(&mut self, handler: impl Action + 'static) -> &mut Self {
        self.not_found = Some(Arc::new(handler));
        self
    }

    pub fn default_action(&self) -> &str {
        &self.default_action
    }

    pub fn action_field(&self) -> &str {
        &self.action_field
    }

    pub fn entry_script(&self) -> &str {
        &self.entry_script
    }

    pub const fn max_forward_depth(&self) -> usize {
        self.max_forward_depth
    }

    /// Whether a handler is registered for exactly this pair
    pub fn has(&self, action: &str, method: &Method) -> bool {
        self.handlers
            .get(action)
            .is_some_and(|by_method| by_method.contains_key(method))
    }

    /// Action named by the request, or the default when absent or empty
    pub fn action_name<'a>(&'a self, request: &'a RequestData) -> &'a str {
        request
            .query()
            .get(&self.action_field)
            .filter(|name| !name.is_empty())
            .unwrap_or(self.default_action.as_str())
    }

    /// Handler for the pair, else the not-found handler
    pub fn route(&self, action: &str, method: &Method) -> Result<&Arc<dyn Action>> {
        if let Some(handler) = self.handlers.get(action).and_then(|m| m.get(method)) {
            return Ok(handler);
        }
        if let Some(handler) = &self.not_found {
            logger::log_not_found(action, method.as_str());
            return Ok(handler);
        }
        Err(Error::NoAction {
            action: action.to_string(),
            method: method.to_string(),
        })
    }

    /// Dispatch the exchange's request
    pub fn run(&self, ex: &mut Exchange<'_>) -> Result<()> {
        self.dispatch(ex, None, None, &Params::new())
    }

    /// Route, bind and invoke
    ///
    /// `action` and `method` override the request's own values; `forwarded`
    /// parameters take precedence over request data.
    pub(crate) fn dispatch(
        &self,
        ex: &mut Exchange<'_>,
        action: Option<&str>,
        method: Option<Method>,
        forwarded: &Params,
    ) -> Result<()> {
        let action = action.map_or_else(
            || self.action_name(ex.request()).to_string(),
            ToString::to_string,
        );
        let method = method.unwrap_or_else(|| ex.request().method().clone());

        let handler = self.route(&action, &method)?;
        let signature = handler.signature();
        let values = params::bind(&signature, ex.request().data(), forwarded);

        logger::log_dispatch(&action, method.as_str(), values.len());
        ex.set_action(action);
        handler.run(ex, &Args::new(values, signature))?;
        Ok(())
    }
}
