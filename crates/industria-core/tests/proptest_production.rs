//! Property-based tests for the production engine.
//!
//! Drives factories through random delivery/step/month sequences and checks
//! the invariants every production step must keep.

use industria_core::coord::{Coord3d, Rotation};
use industria_core::factory::Factory;
use industria_core::fixed::{FIXED_ONE, Fixed64};
use industria_core::id::PlayerId;
use industria_core::production::{
    BOOST_POWER_CHANGE_RATE, InputMode, PRODUCTION_DELTA_T, ProductionParams,
};
use industria_core::test_utils::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Deliver(u32),
    Passengers(u32),
    Power(u8),
    Step(u64),
    Ship(u32),
    Month,
}

fn arb_ops(max_ops: usize) -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(
        prop_oneof![
            (0..60u32).prop_map(Op::Deliver),
            (0..40u32).prop_map(Op::Passengers),
            (0..=100u8).prop_map(Op::Power),
            (0..8 * PRODUCTION_DELTA_T).prop_map(Op::Step),
            (0..20u32).prop_map(Op::Ship),
            Just(Op::Month),
        ],
        1..=max_ops,
    )
}

fn arb_mode() -> impl Strategy<Value = InputMode> {
    prop_oneof![Just(InputMode::Classic), Just(InputMode::Many)]
}

proptest! {
    #[test]
    fn production_invariants_hold(
        name in prop_oneof![
            Just("sawmill"),
            Just("electric_sawmill"),
            Just("carpenter"),
            Just("furniture"),
            Just("forest"),
            Just("windmill"),
        ],
        prodbase in 1..100u32,
        mode in arb_mode(),
        ops in arb_ops(60),
    ) {
        let catalog = sample_catalog();
        let (id, desc) = descriptor(&catalog, name);
        let mut fab = Factory::new(Coord3d::new(5, 5, 0), Rotation::None, PlayerId::PUBLIC, id, desc, prodbase);
        let params = ProductionParams { ticks_per_month: 16 * PRODUCTION_DELTA_T, input_mode: mode };

        for op in ops {
            let before = fab.boosts();
            match op {
                Op::Deliver(n) => {
                    for slot in desc.suppliers.iter() {
                        fab.receive_goods(slot.good, n);
                    }
                }
                Op::Passengers(n) => fab.deliver_passengers(n),
                Op::Power(p) => fab.set_power_satisfaction(Fixed64::from_num(p) / Fixed64::from_num(100)),
                Op::Step(ticks) => {
                    let steps = fab.step(desc, ticks, &params).steps;
                    let after = fab.boosts();
                    let limit = BOOST_POWER_CHANGE_RATE * Fixed64::from_num(steps);
                    prop_assert!((after.electric - before.electric).abs() <= limit);
                    prop_assert!((after.pax - before.pax).abs() <= limit);
                    prop_assert!((after.mail - before.mail).abs() <= limit);
                }
                Op::Ship(n) => {
                    if !fab.outputs().is_empty() {
                        fab.take_output(0, n);
                    }
                }
                Op::Month => fab.new_month(),
            }

            prop_assert!(fab.prodfactor() >= FIXED_ONE);
            prop_assert!(fab.delta_sum() < PRODUCTION_DELTA_T);
            for slot in fab.inputs() {
                prop_assert!(slot.stored <= slot.capacity);
            }
            for slot in fab.outputs() {
                prop_assert!(slot.stored <= slot.capacity);
            }
        }
    }

    #[test]
    fn slots_always_mirror_descriptor(name in prop_oneof![Just("sawmill"), Just("furniture"), Just("windmill")], prodbase in 0..500u32) {
        let catalog = sample_catalog();
        let (id, desc) = descriptor(&catalog, name);
        let fab = Factory::new(Coord3d::new(0, 0, 0), Rotation::None, PlayerId::PUBLIC, id, desc, prodbase);
        prop_assert_eq!(fab.inputs().len(), desc.suppliers.len());
        prop_assert_eq!(fab.outputs().len(), desc.products.len());
        prop_assert!(fab.prodbase() >= 1);
    }
}
