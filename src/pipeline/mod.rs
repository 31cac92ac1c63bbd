//! The resolution pipeline: an ordered list of stages, each a plugin chain
//! in front of a terminal handler. Plugins delegate with [`Next::run`]; not
//! delegating short-circuits the rest of the chain, terminal included.

mod gas;
mod normalize;
mod objects;
mod validate;

pub use gas::{SetGasBudget, SetGasPayment, SetGasPrice};
pub use normalize::NormalizeInputs;
pub use objects::ResolveObjectReferences;
pub use validate::Validate;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::builder::BlockDataBuilder;
use crate::client::{ChainClient, TransactionLimits};
use crate::data::Command;
use crate::error::Error;
use crate::intent::IntentResolver;

/// The named resolution steps, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    NormalizeInputs,
    ResolveObjectReferences,
    SetGasPrice,
    SetGasBudget,
    SetGasPayment,
    ResolveIntents,
    Validate,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::NormalizeInputs => "normalizeInputs",
            Stage::ResolveObjectReferences => "resolveObjectReferences",
            Stage::SetGasPrice => "setGasPrice",
            Stage::SetGasBudget => "setGasBudget",
            Stage::SetGasPayment => "setGasPayment",
            Stage::ResolveIntents => "resolveIntents",
            Stage::Validate => "validate",
        }
    }
}

/// Mutable state threaded through a stage invocation.
pub struct ResolveContext<'a> {
    pub data: &'a mut BlockDataBuilder,
    pub client: Option<&'a dyn ChainClient>,
    pub limits: TransactionLimits,
    pub only_transaction_kind: bool,
    /// The intent name under resolution, inside `resolveIntents` only.
    pub intent: Option<String>,
}

impl<'a> ResolveContext<'a> {
    /// The chain client, or the error naming the stage that needed it. The
    /// returned borrow is independent of `self`, so the caller can keep it
    /// across state mutations.
    pub fn require_client(&self, stage: &'static str) -> Result<&'a dyn ChainClient, Error> {
        self.client.ok_or(Error::MissingClient { stage })
    }
}

/// A stage plugin. Runs before the terminal handler; must invoke
/// `next.run(ctx)` at most once to delegate to the remainder of the chain.
#[async_trait]
pub trait ResolvePlugin: Send + Sync {
    async fn handle(&self, ctx: &mut ResolveContext<'_>, next: Next<'_>) -> Result<(), Error>;
}

/// A stage's default behavior, run after the plugin chain.
#[async_trait]
pub trait TerminalHandler: Send + Sync {
    async fn run(&self, ctx: &mut ResolveContext<'_>) -> Result<(), Error>;
}

/// The remainder of a plugin chain.
pub struct Next<'a> {
    plugins: &'a [Arc<dyn ResolvePlugin>],
    terminal: &'a dyn TerminalHandler,
}

impl Next<'_> {
    pub async fn run(self, ctx: &mut ResolveContext<'_>) -> Result<(), Error> {
        match self.plugins.split_first() {
            Some((head, rest)) => {
                head.handle(
                    ctx,
                    Next {
                        plugins: rest,
                        terminal: self.terminal,
                    },
                )
                .await
            }
            None => self.terminal.run(ctx).await,
        }
    }
}

/// Caller-supplied knobs for a pipeline run.
#[derive(Default)]
pub struct PipelineOptions<'a> {
    pub client: Option<&'a dyn ChainClient>,
    pub limits: Option<TransactionLimits>,
    pub only_transaction_kind: bool,
    /// Stop after input/intent preparation, skipping the gas stages.
    pub prepare_only: bool,
    /// Intent names the eventual executor understands natively; these are
    /// left in place rather than resolved.
    pub supported_intents: &'a [String],
    pub intent_resolvers: Option<&'a HashMap<String, Arc<dyn IntentResolver>>>,
}

/// The ordered stages plus any registered plugins.
#[derive(Clone, Default)]
pub struct ResolutionPipeline {
    plugins: HashMap<Stage, Vec<Arc<dyn ResolvePlugin>>>,
}

impl ResolutionPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, stage: Stage, plugin: Arc<dyn ResolvePlugin>) {
        self.plugins.entry(stage).or_default().push(plugin);
    }

    async fn run_stage(
        &self,
        stage: Stage,
        terminal: &dyn TerminalHandler,
        ctx: &mut ResolveContext<'_>,
    ) -> Result<(), Error> {
        debug!(stage = stage.name(), "running resolution stage");
        let plugins = self
            .plugins
            .get(&stage)
            .map(Vec::as_slice)
            .unwrap_or_default();
        Next { plugins, terminal }.run(ctx).await
    }

    /// Drive every stage in order, mutating `data` in place, and return the
    /// limits the run used. Each terminal handler is a no-op when its
    /// postcondition already holds, so re-running after a failure resumes
    /// where the previous attempt stopped.
    pub async fn run(
        &self,
        data: &mut BlockDataBuilder,
        options: PipelineOptions<'_>,
    ) -> Result<TransactionLimits, Error> {
        let limits = match options.limits {
            Some(limits) => limits,
            None => match options.client {
                Some(client) => TransactionLimits::from_protocol_config(
                    &client
                        .get_protocol_config()
                        .await
                        .map_err(Error::ChainClient)?,
                ),
                None => TransactionLimits::default(),
            },
        };

        let mut ctx = ResolveContext {
            data,
            client: options.client,
            limits,
            only_transaction_kind: options.only_transaction_kind,
            intent: None,
        };

        self.run_stage(Stage::NormalizeInputs, &NormalizeInputs, &mut ctx)
            .await?;
        self.run_stage(
            Stage::ResolveObjectReferences,
            &ResolveObjectReferences,
            &mut ctx,
        )
        .await?;

        // Intents must be rewritten before gas estimation: the budget stage
        // serializes the transaction for a dry run, and symbolic intents
        // have no wire form. A resolver may also have introduced fresh raw
        // or unresolved inputs, so the two preparation stages run again
        // (both are no-ops when nothing is left to do).
        if self.resolve_intents(&mut ctx, &options).await? {
            self.run_stage(Stage::NormalizeInputs, &NormalizeInputs, &mut ctx)
                .await?;
            self.run_stage(
                Stage::ResolveObjectReferences,
                &ResolveObjectReferences,
                &mut ctx,
            )
            .await?;
        }

        if !options.prepare_only && !options.only_transaction_kind {
            self.run_stage(Stage::SetGasPrice, &SetGasPrice, &mut ctx)
                .await?;
            self.run_stage(Stage::SetGasBudget, &SetGasBudget, &mut ctx)
                .await?;
            self.run_stage(Stage::SetGasPayment, &SetGasPayment, &mut ctx)
                .await?;
        }

        self.run_stage(Stage::Validate, &Validate, &mut ctx).await?;
        Ok(limits)
    }

    /// One stage invocation per unsupported intent name discovered. A
    /// resolver may splice in commands that carry further intents; those are
    /// picked up on the next sweep, but each name is resolved at most once.
    /// Returns whether any intent was processed.
    async fn resolve_intents(
        &self,
        ctx: &mut ResolveContext<'_>,
        options: &PipelineOptions<'_>,
    ) -> Result<bool, Error> {
        let mut handled: HashSet<String> = HashSet::new();
        loop {
            let pending: Vec<String> = intent_names(ctx.data)
                .into_iter()
                .filter(|name| {
                    !options.supported_intents.contains(name) && !handled.contains(name)
                })
                .collect();
            if pending.is_empty() {
                return Ok(!handled.is_empty());
            }

            for name in pending {
                debug!(intent = %name, "resolving transaction intent");
                handled.insert(name.clone());
                let resolver_chain: Vec<Arc<dyn ResolvePlugin>> = options
                    .intent_resolvers
                    .and_then(|resolvers| resolvers.get(&name))
                    .map(|resolver| {
                        Arc::new(ResolverPlugin {
                            resolver: Arc::clone(resolver),
                        }) as Arc<dyn ResolvePlugin>
                    })
                    .into_iter()
                    .collect();

                let mut plugins: Vec<Arc<dyn ResolvePlugin>> = self
                    .plugins
                    .get(&Stage::ResolveIntents)
                    .cloned()
                    .unwrap_or_default();
                plugins.extend(resolver_chain);

                ctx.intent = Some(name.clone());
                let terminal = EnsureIntentResolved { name };
                let result = Next {
                    plugins: &plugins,
                    terminal: &terminal,
                }
                .run(ctx)
                .await;
                ctx.intent = None;
                result?;
            }
        }
    }
}

/// Distinct intent names, in command order.
fn intent_names(data: &BlockDataBuilder) -> Vec<String> {
    let mut names = Vec::new();
    for command in &data.state().commands {
        if let Command::TransactionIntent(intent) = command {
            if !names.contains(&intent.name) {
                names.push(intent.name.clone());
            }
        }
    }
    names
}

/// Adapts a registered [`IntentResolver`] into the stage's plugin chain.
struct ResolverPlugin {
    resolver: Arc<dyn IntentResolver>,
}

#[async_trait]
impl ResolvePlugin for ResolverPlugin {
    async fn handle(&self, ctx: &mut ResolveContext<'_>, next: Next<'_>) -> Result<(), Error> {
        self.resolver.resolve(ctx).await?;
        next.run(ctx).await
    }
}

/// Terminal of the `resolveIntents` stage: the named intent must be gone.
struct EnsureIntentResolved {
    name: String,
}

#[async_trait]
impl TerminalHandler for EnsureIntentResolved {
    async fn run(&self, ctx: &mut ResolveContext<'_>) -> Result<(), Error> {
        let remaining = ctx.data.state().commands.iter().any(|command| {
            matches!(command, Command::TransactionIntent(intent) if intent.name == self.name)
        });
        if remaining {
            Err(Error::UnresolvedIntent(self.name.clone()))
        } else {
            Ok(())
        }
    }
}
