use pagetree_core::model::{NodeId, TreeNode};
use proptest::prelude::*;

pub fn id(i: usize) -> NodeId {
    NodeId::from(format!("n{i}"))
}

/// Valid forest: node `i` is a root or hangs under some node `j < i`, so the
/// input is acyclic and every parent resolves. Input order is shuffled.
pub fn arb_forest(max: usize) -> impl Strategy<Value = Vec<TreeNode>> {
    prop::collection::vec(
        (
            any::<prop::sample::Index>(),
            prop::bool::weighted(0.15),
            0_i64..4,
            "[a-e]{1,4}",
        ),
        1..max,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (parent, is_root, position, title))| {
                let parent_id = if i == 0 || is_root {
                    None
                } else {
                    Some(id(parent.index(i)))
                };
                TreeNode::new(id(i), parent_id, title).with_position(position)
            })
            .collect::<Vec<_>>()
    })
    .prop_flat_map(|nodes| Just(nodes).prop_shuffle())
}
