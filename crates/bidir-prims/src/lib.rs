pub mod grids;
pub mod inverse;
pub mod registry;

pub use registry::{standard_ops, MAX_INT};

#[cfg(test)]
mod proptests {
    use bidir_core::{Color, Grid, Val};
    use proptest::prelude::*;

    use crate::{grids, inverse};

    fn arb_grid(max_dim: usize) -> impl Strategy<Value = Grid> {
        (1..=max_dim, 1..=max_dim)
            .prop_flat_map(|(h, w)| {
                proptest::collection::vec(0u8..Color::COUNT, h * w)
                    .prop_map(move |cells| {
                        let cells = cells.into_iter().map(Color).collect();
                        Grid::new(h, w, cells).unwrap()
                    })
            })
    }

    proptest! {
        #[test]
        fn four_clockwise_turns_are_identity(g in arb_grid(6)) {
            let mut turned = g.clone();
            for _ in 0..4 {
                turned = grids::rotate_cw_grid(&turned).unwrap();
            }
            prop_assert_eq!(turned, g);
        }

        #[test]
        fn vstack_cond_inverse_recovers_either_half(
            top in arb_grid(5),
            bottom_rows in 1usize..5,
        ) {
            // Force matching widths by building the bottom from the top's.
            let bottom = Grid::filled(bottom_rows, top.width(), Color(3)).unwrap();
            let out = grids::vstack_pair_grids(&top, &bottom).unwrap();
            let out_val = Val::Grid(out);
            let top_val = Val::Grid(top.clone());
            let bottom_val = Val::Grid(bottom.clone());

            let got = inverse::vstack_pair_cond_inv_top(&out_val, &[Some(&top_val), None]);
            prop_assert_eq!(got.unwrap(), vec![Val::Grid(bottom)]);
            let got = inverse::vstack_pair_cond_inv_bottom(&out_val, &[None, Some(&bottom_val)]);
            prop_assert_eq!(got.unwrap(), vec![Val::Grid(top)]);
        }

        #[test]
        fn kronecker_cond_inverse_is_exact(template in arb_grid(3), mask in arb_grid(3)) {
            // Normalize the mask to {background, 1} so reconstruction is
            // literal, then require the inverse to reproduce it.
            let mask = mask.map(|c| if c.is_background() { c } else { Color(1) });
            prop_assume!(mask.cells().iter().any(|c| !c.is_background()));
            prop_assume!(template.cells().iter().any(|c| !c.is_background()));
            let out = grids::kronecker_grids(&template, &mask).unwrap();
            let got = inverse::kronecker_cond_inv(
                &Val::Grid(out),
                &[Some(&Val::Grid(template)), None],
            );
            prop_assert_eq!(got.unwrap(), vec![Val::Grid(mask)]);
        }
    }
}
