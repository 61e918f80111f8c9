mod common;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use stakecore_chainstate::ChainState;
use stakecore_pos::ChainView;
use stakecore_primitives::outpoint::OutPoint;
use stakecore_primitives::transaction::TxOut;
use stakecore_storage::fjall::FjallStore;

use common::{coinbase, make_block, TestKey, BASE_TIME};

#[test]
fn chain_state_runs_on_fjall() {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("stakecore_chainstate_{nanos}"));
    let store = Arc::new(FjallStore::open(&dir).expect("open fjall"));
    let state = ChainState::open(Arc::clone(&store)).expect("open chain state");

    let key = TestKey::new(21);
    let genesis = make_block(
        [0u8; 32],
        BASE_TIME,
        vec![coinbase(0, vec![TxOut::standard(1_000, key.p2pkh())])],
    );
    let entry0 = state.connect_block(&genesis, None).expect("genesis");
    let block1 = make_block(entry0.hash, BASE_TIME + 16, vec![coinbase(1, Vec::new())]);
    let entry1 = state.connect_block(&block1, None).expect("block 1");

    {
        let snapshot = state.snapshot().expect("snapshot");
        assert_eq!(snapshot.tip_height(), 1);
        assert_eq!(snapshot.get_block_index(1).expect("read"), Some(entry1));
        let coin = snapshot
            .get_coin(&OutPoint::new(genesis.transactions[0].txid(), 0))
            .expect("read")
            .expect("coin");
        assert_eq!(coin.value, 1_000);
    }

    drop(state);
    drop(store);
    let _ = std::fs::remove_dir_all(&dir);
}
