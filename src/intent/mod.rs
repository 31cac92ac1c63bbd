//! Intent resolution. An intent is a symbolic command that a registered
//! resolver rewrites into primitive commands during the `resolveIntents`
//! stage; nothing intent-shaped survives into the encoded transaction.

use async_trait::async_trait;

use crate::builder::BlockDataBuilder;
use crate::data::{Command, TransactionIntent};
use crate::error::Error;
use crate::pipeline::ResolveContext;

/// Rewrites every intent command it is registered for into primitive
/// commands, typically after querying chain state through the context's
/// client.
#[async_trait]
pub trait IntentResolver: std::fmt::Debug + Send + Sync {
    async fn resolve(&self, ctx: &mut ResolveContext<'_>) -> Result<(), Error>;
}

/// Splice every intent named `name` using `rewrite`, walking the command
/// list once. Result references across each splice point are shifted by the
/// builder; the rewrite sees the intent as it currently stands, after any
/// earlier splices.
pub fn rewrite_intents(
    data: &mut BlockDataBuilder,
    name: &str,
    mut rewrite: impl FnMut(&TransactionIntent) -> Result<Vec<Command>, Error>,
) -> Result<(), Error> {
    let mut index = 0usize;
    while index < data.state().commands.len() {
        let intent = match &data.state().commands[index] {
            Command::TransactionIntent(intent) if intent.name == name => intent.clone(),
            _ => {
                index += 1;
                continue;
            }
        };
        let replacement = rewrite(&intent)?;
        let inserted = replacement.len();
        data.replace_command(index as u16, replacement);
        index += inserted;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Argument, MergeCoins, SplitCoins, TransferObjects};

    fn intent(name: &str) -> Command {
        Command::TransactionIntent(TransactionIntent {
            name: name.into(),
            inputs: Default::default(),
            data: serde_json::Value::Null,
        })
    }

    #[test]
    fn rewrites_every_matching_intent() {
        let mut data = BlockDataBuilder::new();
        data.add_command(intent("Budget"));
        data.add_command(intent("Other"));
        data.add_command(intent("Budget"));

        rewrite_intents(&mut data, "Budget", |_| {
            Ok(vec![Command::MergeCoins(MergeCoins {
                destination: Argument::GasCoin,
                sources: vec![],
            })])
        })
        .unwrap();

        let kinds: Vec<_> = data.state().commands.iter().map(Command::kind).collect();
        assert_eq!(kinds, vec!["MergeCoins", "TransactionIntent", "MergeCoins"]);
    }

    #[test]
    fn splices_shift_following_references() {
        let mut data = BlockDataBuilder::new();
        data.add_command(intent("Swap"));
        data.add_command(Command::TransferObjects(TransferObjects {
            objects: vec![Argument::IntentResult(0)],
            recipient: Argument::Input(0),
        }));

        rewrite_intents(&mut data, "Swap", |_| {
            Ok(vec![
                Command::SplitCoins(SplitCoins {
                    coin: Argument::GasCoin,
                    amounts: vec![],
                }),
                Command::MergeCoins(MergeCoins {
                    destination: Argument::Result(0),
                    sources: vec![],
                }),
            ])
        })
        .unwrap();

        assert_eq!(data.state().commands.len(), 3);
        match &data.state().commands[2] {
            Command::TransferObjects(transfer) => {
                // The reference to the replaced intent stays at index 0.
                assert_eq!(transfer.objects, vec![Argument::IntentResult(0)]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
