// Copyright 2025 Relaygate Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Dispatch pipeline.
//!
//! [`GatewaySequence`] drives one request through a fixed series of stages:
//!
//! 1. session bootstrap and identity unlock
//! 2. metadata extraction
//! 3. path normalization
//! 4. route lookup
//! 5. parameter parsing
//! 6. handler invocation
//! 7. response write
//!
//! Stages 4 to 7 are supplied by a [`SequenceActions`] implementation. Any
//! stage failing short-circuits the rest and the error goes to
//! [`SequenceActions::reject`]. Every request ends in exactly one of
//! `send` or `reject`.

use async_trait::async_trait;
use hyper::body::Bytes;
use hyper::Request;
use relaygate_common::{GatewayError, HttpResponse, Result};
use std::sync::Arc;
use tracing::{debug, field, info_span, Instrument};

use crate::bootstrap::SessionBootstrapper;
use crate::context::RequestContext;
use crate::metadata::extract_metadata;
use crate::path::normalize_request;

/// A request with its body fully read.
pub type GatewayRequest = Request<Bytes>;

/// Route-level collaborators of the pipeline.
///
/// `find_route`, `parse_params` and `invoke` run inside the pipeline's error
/// scope. `send` and `reject` produce the final response and cannot fail.
#[async_trait]
pub trait SequenceActions: Send + Sync + 'static {
    /// Matched route
    type Route: Send + Sync;
    /// Parsed invocation arguments
    type Args: Send;
    /// Handler result
    type Output: Send;

    /// Resolves the route for a normalized request.
    fn find_route(&self, request: &GatewayRequest, ctx: &RequestContext) -> Result<Self::Route>;

    /// Extracts invocation arguments from the request.
    async fn parse_params(
        &self,
        request: &GatewayRequest,
        route: &Self::Route,
        ctx: &RequestContext,
    ) -> Result<Self::Args>;

    /// Runs the route's handler.
    async fn invoke(
        &self,
        route: &Self::Route,
        args: Self::Args,
        ctx: &RequestContext,
    ) -> Result<Self::Output>;

    /// Writes a successful result.
    fn send(&self, ctx: &RequestContext, output: Self::Output) -> HttpResponse;

    /// Writes a failure.
    fn reject(&self, ctx: &RequestContext, error: GatewayError) -> HttpResponse;
}

/// Per-request pipeline over a shared bootstrapper and actions.
pub struct GatewaySequence<A> {
    bootstrapper: Arc<SessionBootstrapper>,
    actions: Arc<A>,
}

impl<A> Clone for GatewaySequence<A> {
    fn clone(&self) -> Self {
        Self {
            bootstrapper: self.bootstrapper.clone(),
            actions: self.actions.clone(),
        }
    }
}

impl<A: SequenceActions> GatewaySequence<A> {
    /// Creates a pipeline.
    ///
    /// # Arguments
    /// * `bootstrapper` - Builds or attaches the client session per request
    /// * `actions` - Route lookup, parsing, invocation and response writing
    pub fn new(bootstrapper: Arc<SessionBootstrapper>, actions: Arc<A>) -> Self {
        Self {
            bootstrapper,
            actions,
        }
    }

    pub fn bootstrapper(&self) -> &Arc<SessionBootstrapper> {
        &self.bootstrapper
    }

    pub fn actions(&self) -> &Arc<A> {
        &self.actions
    }

    /// Handles one request to completion.
    ///
    /// Never fails: errors from any stage are handed to `reject` with the
    /// context as far as it was filled.
    pub async fn handle(&self, request: GatewayRequest) -> HttpResponse {
        let span = info_span!(
            "request",
            method = %request.method(),
            path = %request.uri().path(),
            request_id = field::Empty,
        );

        async move {
            let mut ctx = RequestContext::new();
            let mut request = request;

            match self.run(&mut request, &mut ctx).await {
                Ok(output) => {
                    debug!("Request completed");
                    self.actions.send(&ctx, output)
                }
                Err(error) => self.actions.reject(&ctx, error),
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, request: &mut GatewayRequest, ctx: &mut RequestContext) -> Result<A::Output> {
        self.bootstrapper.bootstrap(ctx).await?;

        extract_metadata(request, ctx)?;
        if let Some(request_id) = ctx.request_id() {
            tracing::Span::current().record("request_id", request_id);
        }

        normalize_request(request)?;

        let route = self.actions.find_route(request, ctx)?;
        let args = self.actions.parse_params(request, &route, ctx).await?;
        self.actions.invoke(&route, args, ctx).await
    }
}
