//! `resolveObjectReferences`: fetch chain metadata for every input that is
//! still an id plus collected type signatures, and rewrite it into a
//! concrete object reference.

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::debug;

use crate::address::Address;
use crate::client::{ObjectData, ObjectDataOptions, Owner};
use crate::data::{CallArg, ObjectArg, ObjectRef, SharedObjectRef, UnresolvedObject};
use crate::error::Error;

use super::{ResolveContext, TerminalHandler};

/// Metadata requests are batched this many object ids at a time.
const MAX_OBJECTS_PER_FETCH: usize = 50;

pub struct ResolveObjectReferences;

#[async_trait]
impl TerminalHandler for ResolveObjectReferences {
    async fn run(&self, ctx: &mut ResolveContext<'_>) -> Result<(), Error> {
        let unresolved: Vec<(usize, UnresolvedObject)> = ctx
            .data
            .state()
            .inputs
            .iter()
            .enumerate()
            .filter_map(|(index, input)| match input {
                CallArg::UnresolvedObject(unresolved) => Some((index, unresolved.clone())),
                _ => None,
            })
            .collect();
        if unresolved.is_empty() {
            return Ok(());
        }

        let client = ctx.require_client("resolveObjectReferences")?;

        let mut ids: Vec<Address> = Vec::new();
        for (_, input) in &unresolved {
            if !ids.contains(&input.value) {
                ids.push(input.value);
            }
        }
        debug!(objects = ids.len(), "fetching object metadata");

        let responses = try_join_all(ids.chunks(MAX_OBJECTS_PER_FETCH).map(|chunk| {
            client.multi_get_objects(chunk, ObjectDataOptions { show_owner: true })
        }))
        .await
        .map_err(Error::ChainClient)?
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

        let mut objects: Vec<ObjectData> = Vec::with_capacity(ids.len());
        let mut invalid: Vec<Address> = Vec::new();
        for (id, response) in ids.iter().zip(responses) {
            match (response.error, response.data) {
                (None, Some(data)) => objects.push(data),
                _ => invalid.push(*id),
            }
        }
        if !invalid.is_empty() {
            return Err(Error::InvalidObjectInputs(invalid));
        }

        // All fetches are complete; now rewrite inputs in their original
        // order so the result is deterministic.
        for (index, input) in unresolved {
            let object = objects
                .iter()
                .find(|object| object.object_id == input.value)
                .ok_or_else(|| Error::InvalidObjectInputs(vec![input.value]))?;
            ctx.data.state_mut().inputs[index] = resolve_input(&input, object);
        }
        Ok(())
    }
}

fn resolve_input(input: &UnresolvedObject, object: &ObjectData) -> CallArg {
    let initial_shared_version = match object.owner {
        Some(Owner::Shared {
            initial_shared_version,
        }) => Some(initial_shared_version),
        _ => None,
    };

    let is_by_value = input
        .type_signatures
        .iter()
        .any(|signature| signature.is_by_value());
    let is_mutable = is_by_value
        || input
            .type_signatures
            .iter()
            .any(|signature| signature.is_mutable_ref());

    if let Some(initial_shared_version) = initial_shared_version {
        return CallArg::Object(ObjectArg::SharedObject(SharedObjectRef {
            object_id: object.object_id,
            initial_shared_version,
            mutable: is_mutable,
        }));
    }

    let reference = ObjectRef {
        object_id: object.object_id,
        version: object.version,
        digest: object.digest,
    };
    let is_receiving = input
        .type_signatures
        .iter()
        .any(|signature| signature.is_receiving());
    if is_receiving {
        CallArg::Object(ObjectArg::Receiving(reference))
    } else {
        CallArg::Object(ObjectArg::ImmOrOwnedObject(reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::Digest;
    use crate::signature::{
        DatatypeSignature, OpenMoveTypeSignature, OpenMoveTypeSignatureBody, PrimitiveType,
        RefKind,
    };

    fn object(id: &str, owner: Owner) -> ObjectData {
        ObjectData {
            object_id: id.parse().unwrap(),
            version: 9,
            digest: Digest::new([5; 32]),
            owner: Some(owner),
        }
    }

    fn unresolved(id: &str, signatures: Vec<OpenMoveTypeSignature>) -> UnresolvedObject {
        UnresolvedObject {
            value: id.parse().unwrap(),
            type_signatures: signatures,
        }
    }

    fn coin_signature(reference: Option<RefKind>) -> OpenMoveTypeSignature {
        OpenMoveTypeSignature {
            reference,
            body: OpenMoveTypeSignatureBody::Datatype {
                datatype: DatatypeSignature {
                    package: Address::TWO,
                    module: "coin".into(),
                    type_name: "Coin".into(),
                    type_parameters: vec![],
                },
            },
        }
    }

    #[test]
    fn owned_objects_become_imm_or_owned() {
        let owner = Owner::AddressOwner("0x11".parse().unwrap());
        let resolved = resolve_input(
            &unresolved("0xaaa", vec![coin_signature(Some(RefKind::Immutable))]),
            &object("0xaaa", owner),
        );
        match resolved {
            CallArg::Object(ObjectArg::ImmOrOwnedObject(obj)) => {
                assert_eq!(obj.version, 9);
            }
            other => panic!("unexpected input {other:?}"),
        }
    }

    #[test]
    fn shared_mutability_follows_signatures() {
        let shared = Owner::Shared {
            initial_shared_version: 3,
        };

        let read_only = resolve_input(
            &unresolved("0xbbb", vec![coin_signature(Some(RefKind::Immutable))]),
            &object("0xbbb", shared),
        );
        match read_only {
            CallArg::Object(ObjectArg::SharedObject(obj)) => {
                assert_eq!(obj.initial_shared_version, 3);
                assert!(!obj.mutable);
            }
            other => panic!("unexpected input {other:?}"),
        }

        let mutable = resolve_input(
            &unresolved("0xbbb", vec![coin_signature(Some(RefKind::Mutable))]),
            &object("0xbbb", shared),
        );
        match mutable {
            CallArg::Object(ObjectArg::SharedObject(obj)) => assert!(obj.mutable),
            other => panic!("unexpected input {other:?}"),
        }

        // By-value use also forces a mutable reference.
        let by_value = resolve_input(
            &unresolved("0xbbb", vec![coin_signature(None)]),
            &object("0xbbb", shared),
        );
        match by_value {
            CallArg::Object(ObjectArg::SharedObject(obj)) => assert!(obj.mutable),
            other => panic!("unexpected input {other:?}"),
        }
    }

    #[test]
    fn receiving_parameters_become_receiving_refs() {
        let signature = OpenMoveTypeSignature {
            reference: None,
            body: OpenMoveTypeSignatureBody::Datatype {
                datatype: DatatypeSignature {
                    package: Address::TWO,
                    module: "transfer".into(),
                    type_name: "Receiving".into(),
                    type_parameters: vec![OpenMoveTypeSignatureBody::Primitive(
                        PrimitiveType::Address,
                    )],
                },
            },
        };
        let owner = Owner::AddressOwner("0x11".parse().unwrap());
        let resolved = resolve_input(&unresolved("0xccc", vec![signature]), &object("0xccc", owner));
        assert!(matches!(
            resolved,
            CallArg::Object(ObjectArg::Receiving(_))
        ));
    }
}
