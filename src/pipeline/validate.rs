//! `validate`: final size checks over the fully resolved state.

use async_trait::async_trait;

use crate::data::CallArg;
use crate::error::Error;

use super::{ResolveContext, TerminalHandler};

pub struct Validate;

#[async_trait]
impl TerminalHandler for Validate {
    async fn run(&self, ctx: &mut ResolveContext<'_>) -> Result<(), Error> {
        let max = ctx.limits.max_pure_argument_size;
        for (index, input) in ctx.data.state().inputs.iter().enumerate() {
            if let CallArg::Pure(pure) = input {
                if pure.bytes.len() as u64 > max {
                    return Err(Error::PureTooLarge {
                        index,
                        got: pure.bytes.len(),
                        max,
                    });
                }
            }
        }
        Ok(())
    }
}
