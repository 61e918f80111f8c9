mod common;

use stakecore_chainstate::{ChainState, ChainStateError};
use stakecore_consensus::{consensus_params, Network};
use stakecore_pos::{
    check_proof_of_stake, compute_stake_modifier, kernel_hash, search_kernel_time, ChainView,
    PosError,
};
use stakecore_primitives::outpoint::OutPoint;
use stakecore_primitives::transaction::{Transaction, TxIn, TxOut, TxType};
use stakecore_script::{ScriptError, StandardScriptVerifier};
use stakecore_storage::memory::MemoryStore;

use common::{coinbase, empty_state, extend_to, make_block, TestKey, BASE_TIME, EASY_BITS};

const STAKE: i64 = 30_000;

struct Staker {
    state: ChainState<MemoryStore>,
    key: TestKey,
    prevout: OutPoint,
}

fn staker() -> Staker {
    let (_store, state) = empty_state();
    let key = TestKey::new(11);
    let genesis = make_block(
        [0u8; 32],
        BASE_TIME,
        vec![coinbase(0, vec![TxOut::standard(STAKE, key.p2pkh())])],
    );
    let prevout = OutPoint::new(genesis.transactions[0].txid(), 0);
    state.connect_block(&genesis, None).expect("genesis");
    extend_to(&state, 40);
    Staker {
        state,
        key,
        prevout,
    }
}

impl Staker {
    fn coinstake(&self, amount_signed: i64) -> Transaction {
        let mut tx = Transaction::new(TxType::Coinstake);
        tx.vin.push(TxIn::new(self.prevout.clone()));
        tx.vout.push(TxOut::standard(STAKE + 10, self.key.p2pkh()));
        self.key
            .sign_input(&mut tx, 0, &self.key.p2pkh(), amount_signed);
        tx
    }

    fn kernel_time(&self) -> u32 {
        let params = consensus_params(Network::Mainnet);
        let snapshot = self.state.snapshot().expect("snapshot");
        let prev = snapshot.tip().cloned().expect("tip");
        search_kernel_time(
            &snapshot,
            &params,
            &prev,
            EASY_BITS,
            &self.prevout,
            prev.time + 1,
            prev.time + 4_096,
        )
        .expect("usable coin")
        .expect("kernel within range")
        .time
    }
}

#[test]
fn staked_block_is_accepted_and_feeds_the_modifier() {
    let params = consensus_params(Network::Mainnet);
    let staker = staker();
    let prev = staker.state.tip().expect("tip").expect("chain");
    let time = staker.kernel_time();
    let coinstake = staker.coinstake(STAKE);
    let block = make_block(prev.hash, time, vec![coinstake.clone()]);

    let entry = staker
        .state
        .accept_block(&params, &StandardScriptVerifier, &block)
        .expect("staked block");
    let expected_proof = kernel_hash(&prev.stake_modifier, BASE_TIME, &staker.prevout, time);
    assert_eq!(entry.height, 41);
    assert_eq!(entry.proof_hash, expected_proof);
    assert_eq!(
        entry.stake_modifier,
        compute_stake_modifier(Some(&prev.stake_modifier), &expected_proof)
    );

    // The kernel coin is gone from the live set; validation of the same
    // coinstake falls back to the transaction index.
    let snapshot = staker.state.snapshot().expect("snapshot");
    assert_eq!(snapshot.get_coin(&staker.prevout).expect("read"), None);
    let proof = check_proof_of_stake(
        &snapshot,
        &params,
        &StandardScriptVerifier,
        &prev,
        &coinstake,
        time,
        EASY_BITS,
    )
    .expect("historical kernel");
    assert_eq!(proof.hash_proof_of_stake, expected_proof);

    let reward = snapshot
        .get_coin(&OutPoint::new(coinstake.txid(), 0))
        .expect("read")
        .expect("coinstake output");
    assert_eq!((reward.value, reward.height), (STAKE + 10, 41));
}

#[test]
fn staked_block_rejections_do_not_connect() {
    let params = consensus_params(Network::Mainnet);
    let staker = staker();
    let prev = staker.state.tip().expect("tip").expect("chain");
    let time = staker.kernel_time();

    let misaligned = make_block(prev.hash, time + 1, vec![staker.coinstake(STAKE)]);
    assert!(matches!(
        staker
            .state
            .accept_block(&params, &StandardScriptVerifier, &misaligned),
        Err(ChainStateError::BadCoinstakeTimestamp { height: 41, time: t }) if t == time + 1
    ));

    let bad_sig = make_block(prev.hash, time, vec![staker.coinstake(STAKE + 1)]);
    assert!(matches!(
        staker
            .state
            .accept_block(&params, &StandardScriptVerifier, &bad_sig),
        Err(ChainStateError::Stake(PosError::ScriptVerifyFailed(
            ScriptError::SigCheck
        )))
    ));

    assert_eq!(staker.state.tip().expect("tip"), Some(prev.clone()));
    let snapshot = staker.state.snapshot().expect("snapshot");
    assert!(snapshot.get_coin(&staker.prevout).expect("read").is_some());
}

#[test]
fn young_coins_cannot_stake() {
    let params = consensus_params(Network::Mainnet);
    let (_store, state) = empty_state();
    let key = TestKey::new(12);
    let genesis = make_block(
        [0u8; 32],
        BASE_TIME,
        vec![coinbase(0, vec![TxOut::standard(STAKE, key.p2pkh())])],
    );
    let prevout = OutPoint::new(genesis.transactions[0].txid(), 0);
    state.connect_block(&genesis, None).expect("genesis");
    extend_to(&state, 4);

    let young_funding = {
        let tip = state.tip().expect("tip").expect("chain");
        let mut tx = Transaction::new(TxType::Standard);
        tx.vin.push(TxIn::new(prevout));
        tx.vout.push(TxOut::standard(STAKE, key.p2pkh()));
        let block = make_block(tip.hash, tip.time + 16, vec![coinbase(5, Vec::new()), tx.clone()]);
        state.connect_block(&block, None).expect("funding block");
        tx
    };
    extend_to(&state, 8);

    let young = OutPoint::new(young_funding.txid(), 0);
    let tip = state.tip().expect("tip").expect("chain");
    let mut coinstake = Transaction::new(TxType::Coinstake);
    coinstake.vin.push(TxIn::new(young.clone()));
    coinstake.vout.push(TxOut::standard(STAKE, key.p2pkh()));
    key.sign_input(&mut coinstake, 0, &key.p2pkh(), STAKE);

    let block = make_block(tip.hash, tip.time + 16, vec![coinstake]);
    let err = state
        .accept_block(&params, &StandardScriptVerifier, &block)
        .expect_err("young coin");
    assert!(matches!(
        err,
        ChainStateError::Stake(PosError::StakeTooYoung {
            depth: 3,
            required: 4,
        })
    ));
}
