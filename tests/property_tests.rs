#[cfg(test)]
mod property_tests {
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use theseus::agent::{TraceKind, TraceTable};
    use theseus::maze::{Action, ActionSet, Cell, CellState, Grid, MazeEnvironment, RewardConfig};
    use theseus::policy;
    use theseus::replay_buffer::ReplayBuffer;

    // A grid whose top-left corner is the first free cell and whose
    // bottom-right corner is the exit.
    fn maze_strategy() -> impl Strategy<Value = (Grid, Cell)> {
        (3usize..=7, 3usize..=7).prop_flat_map(|(width, height)| {
            prop::collection::vec(prop::bool::weighted(0.3), width * height).prop_map(move |walls| {
                let mut cells: Vec<CellState> = walls
                    .into_iter()
                    .map(|wall| if wall { CellState::Wall } else { CellState::Free })
                    .collect();
                cells[0] = CellState::Free;
                let last = cells.len() - 1;
                cells[last] = CellState::Free;
                let grid = Grid::new(width, height, cells).unwrap();
                (grid, Cell::new(width - 1, height - 1))
            })
        })
    }

    fn actions_strategy() -> impl Strategy<Value = Vec<Action>> {
        prop::collection::vec(prop::sample::select(Action::ALL.to_vec()), 1..80)
    }

    fn values_strategy() -> impl Strategy<Value = [f32; 4]> {
        prop::array::uniform4(-10.0f32..10.0)
    }

    fn legal_strategy() -> impl Strategy<Value = ActionSet> {
        prop::sample::subsequence(Action::ALL.to_vec(), 0..=4)
            .prop_map(|actions| actions.into_iter().collect())
    }

    proptest! {
        #[test]
        fn test_steps_are_deterministic((grid, exit) in maze_strategy(), actions in actions_strategy()) {
            let mut first = MazeEnvironment::new(grid.clone(), exit).unwrap();
            let mut second = MazeEnvironment::new(grid, exit).unwrap();
            for action in actions {
                let a = first.step(action);
                let b = second.step(action);
                prop_assert_eq!(&a, &b);
                if a.is_err() {
                    break;
                }
            }
        }

        #[test]
        fn test_every_step_earns_exactly_one_band((grid, exit) in maze_strategy(), actions in actions_strategy()) {
            let rewards = RewardConfig::default();
            let mut env = MazeEnvironment::new(grid, exit).unwrap();
            for action in actions {
                let before = env.position();
                let target = env.grid().target(before, action);
                let Ok(outcome) = env.step(action) else { break };

                match target {
                    Some(next) => {
                        prop_assert_eq!(outcome.next_state, next);
                        prop_assert!(
                            outcome.reward == rewards.exit
                                || outcome.reward == rewards.step
                                || outcome.reward == rewards.revisit
                        );
                        prop_assert_eq!(outcome.reward == rewards.exit, next == exit);
                    }
                    None => {
                        prop_assert_eq!(outcome.next_state, before);
                        prop_assert_eq!(outcome.reward, rewards.wall_bump);
                    }
                }
                prop_assert!(env.steps() <= env.max_steps());
            }
        }

        #[test]
        fn test_greedy_choice_is_legal_and_maximal(values in values_strategy(), legal in legal_strategy()) {
            let action = policy::greedy_action(&values, legal);
            let candidates = if legal.is_empty() { ActionSet::all() } else { legal };
            prop_assert!(candidates.contains(action));
            for other in candidates.iter() {
                prop_assert!(values[action.index()] >= values[other.index()]);
                if values[other.index()] == values[action.index()] {
                    prop_assert!(action.index() <= other.index());
                }
            }
        }

        #[test]
        fn test_exploration_stays_legal(
            values in values_strategy(),
            legal in legal_strategy(),
            epsilon in 0.0f32..=1.0,
            seed in any::<u64>(),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let candidates = if legal.is_empty() { ActionSet::all() } else { legal };
            for _ in 0..20 {
                let action = policy::select_action(&values, legal, epsilon, &mut rng);
                prop_assert!(candidates.contains(action));
            }
        }

        #[test]
        fn test_replacing_traces_stay_in_unit_range(
            visits in prop::collection::vec((0usize..4, 0usize..4, prop::sample::select(Action::ALL.to_vec())), 1..50),
            factor in 0.0f32..=1.0,
        ) {
            let mut traces = TraceTable::new(TraceKind::Replacing);
            for (x, y, action) in visits {
                traces.visit(Cell::new(x, y), action);
                prop_assert_eq!(traces.get(Cell::new(x, y), action), 1.0);
                traces.decay(factor);
                prop_assert!(traces.iter().all(|(_, &trace)| trace > 0.0 && trace <= 1.0));
            }
        }

        #[test]
        fn test_replay_buffer_keeps_newest(capacity in 1usize..20, count in 0usize..60) {
            let mut buffer = ReplayBuffer::new(capacity).unwrap();
            for i in 0..count {
                buffer.add(i);
            }
            prop_assert_eq!(buffer.len(), count.min(capacity));
            let kept: Vec<usize> = buffer.iter().copied().collect();
            let expected: Vec<usize> = (count.saturating_sub(capacity)..count).collect();
            prop_assert_eq!(kept, expected);

            let mut rng = StdRng::seed_from_u64(count as u64);
            let batch = buffer.sample(capacity, &mut rng);
            prop_assert_eq!(batch.len(), buffer.len());
        }
    }
}
