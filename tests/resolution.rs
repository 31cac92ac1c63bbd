//! End-to-end builds against a mocked chain client.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;

use sui_transaction_builder::{
    rewrite_intents, Address, Argument, BlockDataBuilder, BoxError, BuildArgs, CallArg,
    ChainClient, Coin, Command, Digest, DryRunEffects, DryRunResponse, EffectsStatus, Error,
    GasCostSummary, IntentResolver, MergeCoins, NormalizedFunction, NormalizedStructType,
    NormalizedType, ObjectArg, ObjectData, ObjectDataOptions, ObjectResponse, Owner,
    ProtocolConfig, ResolveContext, ResolveOptions, SharedObjectRef, SplitCoins,
    TransactionBuilder,
};

#[derive(Default)]
struct MockClient {
    gas_price: u64,
    coins: Vec<Coin>,
    objects: HashMap<Address, ObjectResponse>,
    functions: HashMap<String, NormalizedFunction>,
    gas_used: GasCostSummary,
    dry_run_error: Option<String>,
}

#[async_trait]
impl ChainClient for MockClient {
    async fn get_reference_gas_price(&self) -> Result<u64, BoxError> {
        Ok(self.gas_price)
    }

    async fn get_coins(&self, _owner: Address, _coin_type: &str) -> Result<Vec<Coin>, BoxError> {
        Ok(self.coins.clone())
    }

    async fn multi_get_objects(
        &self,
        ids: &[Address],
        _options: ObjectDataOptions,
    ) -> Result<Vec<ObjectResponse>, BoxError> {
        Ok(ids
            .iter()
            .map(|id| {
                self.objects.get(id).cloned().unwrap_or(ObjectResponse {
                    data: None,
                    error: Some(serde_json::json!({ "code": "notExists" })),
                })
            })
            .collect())
    }

    async fn get_normalized_move_function(
        &self,
        package: Address,
        module: &str,
        function: &str,
    ) -> Result<NormalizedFunction, BoxError> {
        self.functions
            .get(&format!("{package}::{module}::{function}"))
            .cloned()
            .ok_or_else(|| format!("unknown function {module}::{function}").into())
    }

    async fn dry_run_transaction_block(
        &self,
        _transaction_block: &[u8],
    ) -> Result<DryRunResponse, BoxError> {
        Ok(DryRunResponse {
            effects: DryRunEffects {
                status: EffectsStatus {
                    status: if self.dry_run_error.is_none() {
                        "success".into()
                    } else {
                        "failure".into()
                    },
                    error: self.dry_run_error.clone(),
                },
                gas_used: self.gas_used,
            },
        })
    }

    async fn get_protocol_config(&self) -> Result<ProtocolConfig, BoxError> {
        Ok(ProtocolConfig::default())
    }
}

fn addr(s: &str) -> Address {
    s.parse().unwrap()
}

fn owned_by(id: &str, owner: &str) -> (Address, ObjectResponse) {
    (
        addr(id),
        ObjectResponse {
            data: Some(ObjectData {
                object_id: addr(id),
                version: 7,
                digest: Digest::new([2; 32]),
                owner: Some(Owner::AddressOwner(addr(owner))),
            }),
            error: None,
        },
    )
}

fn coin(id: &str) -> Coin {
    Coin {
        coin_object_id: addr(id),
        version: 5,
        digest: Digest::new([4; 32]),
    }
}

fn transfer_client() -> MockClient {
    MockClient {
        gas_price: 1000,
        coins: vec![coin("0xdef")],
        objects: HashMap::from([owned_by("0xaaa", "0x11")]),
        // 1000 computation units at price 1000.
        gas_used: GasCostSummary {
            computation_cost: 1_000_000,
            storage_cost: 100,
            storage_rebate: 50,
        },
        ..Default::default()
    }
}

fn transfer_builder() -> TransactionBuilder {
    let mut tx = TransactionBuilder::new();
    tx.set_sender(addr("0x11"));
    let object = tx.object("0xaaa").unwrap();
    tx.transfer_objects(vec![object], addr("0xbbb"));
    tx
}

#[tokio::test]
async fn transfer_of_one_coin_estimates_gas_and_resolves_objects() {
    let client = transfer_client();
    let mut tx = transfer_builder();
    let options = ResolveOptions {
        client: Some(&client),
        ..Default::default()
    };
    let bytes = tx.build(&options).await.unwrap();
    assert!(!bytes.is_empty());

    let state = tx.data().state();
    assert_eq!(state.gas_data.price, Some(1000));
    // computation 1_000_000 + overhead 1000 * 1000 + storage 100 - rebate 50
    assert_eq!(state.gas_data.budget, Some(2_000_050));
    let payment = state.gas_data.payment.as_ref().unwrap();
    assert_eq!(payment.len(), 1);
    assert_eq!(payment[0].object_id, addr("0xdef"));
    match &state.inputs[0] {
        CallArg::Object(ObjectArg::ImmOrOwnedObject(obj)) => {
            assert_eq!(obj.object_id, addr("0xaaa"));
            assert_eq!(obj.version, 7);
        }
        other => panic!("unexpected input {other:?}"),
    }
}

#[tokio::test]
async fn digest_is_deterministic_and_build_round_trips() {
    let client = transfer_client();
    let options = ResolveOptions {
        client: Some(&client),
        ..Default::default()
    };

    let mut first = transfer_builder();
    let mut second = transfer_builder();
    let digest_a = first.digest(&options).await.unwrap();
    let digest_b = second.digest(&options).await.unwrap();
    assert_eq!(digest_a, digest_b);

    let bytes = first.build(&options).await.unwrap();
    let restored = BlockDataBuilder::from_bytes(&bytes).unwrap();
    assert_eq!(restored.build(&BuildArgs::default()).unwrap(), bytes);
}

#[tokio::test]
async fn pipeline_is_idempotent_across_builds() {
    let client = transfer_client();
    let mut tx = transfer_builder();
    let options = ResolveOptions {
        client: Some(&client),
        ..Default::default()
    };
    let first = tx.build(&options).await.unwrap();
    let second = tx.build(&options).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn shared_object_is_upgraded_to_mutable_by_call_signature() {
    let mut client = MockClient::default();
    client.functions.insert(
        format!("{}::pool::update", addr("0x7")),
        NormalizedFunction {
            parameters: vec![NormalizedType::MutableReference(Box::new(
                NormalizedType::Struct(NormalizedStructType {
                    address: addr("0x7"),
                    module: "pool".into(),
                    name: "Pool".into(),
                    type_arguments: vec![],
                }),
            ))],
        },
    );

    let mut tx = TransactionBuilder::new();
    let pool = tx
        .object(CallArg::Object(ObjectArg::SharedObject(SharedObjectRef {
            object_id: addr("0x99"),
            initial_shared_version: 3,
            mutable: false,
        })))
        .unwrap();
    tx.move_call("0x7::pool::update".parse().unwrap(), vec![pool]);

    let options = ResolveOptions {
        client: Some(&client),
        ..Default::default()
    };
    tx.to_json(&options).await.unwrap();

    assert_eq!(tx.data().state().inputs.len(), 1);
    match &tx.data().state().inputs[0] {
        CallArg::Object(ObjectArg::SharedObject(obj)) => assert!(obj.mutable),
        other => panic!("unexpected input {other:?}"),
    }
}

#[tokio::test]
async fn raw_values_are_typed_from_call_signatures() {
    let mut client = MockClient::default();
    client.functions.insert(
        format!("{}::counter::set", addr("0x8")),
        NormalizedFunction {
            parameters: vec![
                NormalizedType::U64,
                NormalizedType::MutableReference(Box::new(NormalizedType::Struct(
                    NormalizedStructType {
                        address: Address::TWO,
                        module: "tx_context".into(),
                        name: "TxContext".into(),
                        type_arguments: vec![],
                    },
                ))),
            ],
        },
    );

    let mut tx = TransactionBuilder::new();
    let value = tx.pure_value(serde_json::json!(42));
    tx.move_call("0x8::counter::set".parse().unwrap(), vec![value]);

    let options = ResolveOptions {
        client: Some(&client),
        ..Default::default()
    };
    tx.to_json(&options).await.unwrap();

    assert_eq!(
        tx.data().state().inputs[0],
        CallArg::pure(bcs::to_bytes(&42u64).unwrap())
    );
}

#[derive(Debug)]
struct FooResolver;

#[async_trait]
impl IntentResolver for FooResolver {
    async fn resolve(&self, ctx: &mut ResolveContext<'_>) -> Result<(), Error> {
        rewrite_intents(ctx.data, "foo", |_| {
            Ok(vec![
                Command::SplitCoins(SplitCoins {
                    coin: Argument::GasCoin,
                    amounts: vec![],
                }),
                Command::MergeCoins(MergeCoins {
                    destination: Argument::GasCoin,
                    sources: vec![],
                }),
            ])
        })
    }
}

fn intent_builder() -> TransactionBuilder {
    let mut tx = TransactionBuilder::new();
    tx.set_sender(addr("0x11"));
    tx.intent("foo", BTreeMap::new(), serde_json::Value::Null);
    let split = tx.split_coins(tx.gas(), vec![100u64]);
    tx.transfer_objects(vec![split.at(0)], addr("0xbbb"));
    tx
}

#[tokio::test]
async fn unsupported_intent_fails_without_a_resolver() {
    let client = transfer_client();
    let mut tx = intent_builder();
    let options = ResolveOptions {
        client: Some(&client),
        ..Default::default()
    };
    let err = tx.build(&options).await.unwrap_err();
    assert!(matches!(err, Error::UnresolvedIntent(name) if name == "foo"));
}

#[tokio::test]
async fn resolved_intent_shifts_following_command_indices() {
    let client = transfer_client();
    let mut tx = intent_builder();
    tx.register_intent_resolver("foo", Arc::new(FooResolver))
        .unwrap();
    let options = ResolveOptions {
        client: Some(&client),
        ..Default::default()
    };
    tx.build(&options).await.unwrap();

    let commands = &tx.data().state().commands;
    assert_eq!(commands.len(), 4);
    assert_eq!(commands[0].kind(), "SplitCoins");
    assert_eq!(commands[1].kind(), "MergeCoins");
    // The transfer originally referenced the split at index 1; the splice
    // grew the prefix by one.
    match &commands[3] {
        Command::TransferObjects(transfer) => {
            assert_eq!(transfer.objects, vec![Argument::NestedResult(2, 0)]);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[tokio::test]
async fn supported_intents_are_left_in_place() {
    let client = transfer_client();
    let mut tx = TransactionBuilder::new();
    tx.intent("foo", BTreeMap::new(), serde_json::Value::Null);
    tx.add_supported_intent("foo");
    let options = ResolveOptions {
        client: Some(&client),
        ..Default::default()
    };
    let json = tx.to_json(&options).await.unwrap();
    assert!(json.contains("TransactionIntent"));
}

#[tokio::test]
async fn gas_payment_skips_coins_used_as_inputs() {
    let mut client = transfer_client();
    client.objects.extend([owned_by("0xabc", "0x11")]);
    client.coins = vec![coin("0xabc"), coin("0xdef")];

    let mut tx = TransactionBuilder::new();
    tx.set_sender(addr("0x11"));
    let object = tx.object("0xabc").unwrap();
    tx.transfer_objects(vec![object], addr("0xbbb"));

    let options = ResolveOptions {
        client: Some(&client),
        ..Default::default()
    };
    tx.build(&options).await.unwrap();

    let payment = tx.data().state().gas_data.payment.clone().unwrap();
    assert_eq!(payment.len(), 1);
    assert_eq!(payment[0].object_id, addr("0xdef"));
}

#[tokio::test]
async fn unknown_objects_fail_with_their_ids() {
    let client = MockClient::default();
    let mut tx = TransactionBuilder::new();
    tx.set_sender(addr("0x11"));
    let object = tx.object("0xeee").unwrap();
    tx.transfer_objects(vec![object], addr("0xbbb"));

    let options = ResolveOptions {
        client: Some(&client),
        ..Default::default()
    };
    let err = tx.build(&options).await.unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidObjectInputs(ids) if ids == vec![addr("0xeee")]
    ));
}

#[tokio::test]
async fn failed_dry_run_aborts_the_build() {
    let mut client = transfer_client();
    client.dry_run_error = Some("MoveAbort(4)".into());
    let mut tx = transfer_builder();
    let options = ResolveOptions {
        client: Some(&client),
        ..Default::default()
    };
    let err = tx.build(&options).await.unwrap_err();
    assert!(matches!(
        err,
        Error::DryRunFailed { effects_error, .. } if effects_error == "MoveAbort(4)"
    ));
}

#[tokio::test]
async fn explicit_gas_configuration_skips_estimation() {
    // No prices, coins, or dry-run data configured: the stages must no-op.
    let mut client = MockClient::default();
    client.objects.extend([owned_by("0xaaa", "0x11")]);

    let mut tx = transfer_builder();
    tx.set_gas_price(500);
    tx.set_gas_budget(1_000_000);
    tx.set_gas_payment(vec![sui_transaction_builder::ObjectRef {
        object_id: addr("0xdef"),
        version: 5,
        digest: Digest::new([4; 32]),
    }]);

    let options = ResolveOptions {
        client: Some(&client),
        ..Default::default()
    };
    tx.build(&options).await.unwrap();
    assert_eq!(tx.data().state().gas_data.price, Some(500));
    assert_eq!(tx.data().state().gas_data.budget, Some(1_000_000));
}

#[tokio::test]
async fn oversized_pure_inputs_fail_validation() {
    use sui_transaction_builder::TransactionLimits;

    let client = transfer_client();
    let mut tx = transfer_builder();
    tx.pure_bytes(vec![0; 32]);

    let options = ResolveOptions {
        client: Some(&client),
        limits: Some(TransactionLimits {
            max_pure_argument_size: 16,
            ..Default::default()
        }),
        ..Default::default()
    };
    let err = tx.build(&options).await.unwrap_err();
    // The 32-byte recipient address is the first offending pure input.
    assert!(matches!(err, Error::PureTooLarge { got: 32, max: 16, .. }));
}

#[tokio::test]
async fn explicit_payment_above_the_object_limit_is_rejected() {
    use sui_transaction_builder::{ObjectRef, TransactionLimits};

    let client = transfer_client();
    let mut tx = transfer_builder();
    let payment: Vec<ObjectRef> = (0..3)
        .map(|i| ObjectRef {
            object_id: addr(&format!("0x{i}")),
            version: 1,
            digest: Digest::new([i as u8; 32]),
        })
        .collect();
    tx.set_gas_payment(payment);

    let options = ResolveOptions {
        client: Some(&client),
        limits: Some(TransactionLimits {
            max_gas_objects: 2,
            ..Default::default()
        }),
        ..Default::default()
    };
    let err = tx.build(&options).await.unwrap_err();
    assert!(matches!(err, Error::TooManyGasCoins { max: 2 }));
}

#[tokio::test]
async fn gas_selection_with_no_coins_fails() {
    let mut client = transfer_client();
    client.coins = Vec::new();
    let mut tx = transfer_builder();
    let options = ResolveOptions {
        client: Some(&client),
        ..Default::default()
    };
    let err = tx.build(&options).await.unwrap_err();
    assert!(matches!(err, Error::NoGasCoins));
}

#[tokio::test]
async fn missing_client_surfaces_the_stage_name() {
    let mut tx = transfer_builder();
    let err = tx.build(&ResolveOptions::default()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::MissingClient {
            stage: "resolveObjectReferences"
        }
    ));
}

#[tokio::test]
async fn only_transaction_kind_skips_gas_stages() {
    let mut client = MockClient::default();
    client.objects.extend([owned_by("0xaaa", "0x11")]);

    let mut tx = transfer_builder();
    let options = ResolveOptions {
        client: Some(&client),
        only_transaction_kind: true,
        ..Default::default()
    };
    let bytes = tx.build(&options).await.unwrap();
    assert!(tx.data().state().gas_data.budget.is_none());

    let restored = BlockDataBuilder::from_kind_bytes(&bytes).unwrap();
    assert_eq!(
        restored
            .build(&BuildArgs {
                only_transaction_kind: true,
                ..Default::default()
            })
            .unwrap(),
        bytes
    );
}
