use cucumber::given;

use crate::cucumber::{matching_world::MatchingSystem, MatchingWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut MatchingWorld) {
    let system = MatchingSystem::new().await;
    world.system = Some(system);
}
