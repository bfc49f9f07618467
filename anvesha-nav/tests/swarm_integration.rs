//! Scenario tests driving whole swarms through the in-process host.

use anvesha_map::WorldPoint;
use anvesha_nav::{
    AgentId, AgentKind, Explorer, GridWorld, IndividualMessage, MessageBus, Payload, Scenario,
    SwarmConfig, SwarmRunner,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn config_with_vision(vision: i32) -> SwarmConfig {
    let mut config = SwarmConfig::default();
    config.agent.vision_radius = vision;
    config
}

#[test]
fn lone_agent_sights_exit_and_heads_there() {
    init_logging();
    // 5x5, agent at (0,0), exit at (4,4), vision covers the whole grid.
    let scenario = Scenario::from_ascii(
        "\
        . . . . E\n\
        . . . . .\n\
        . . . . .\n\
        . . . . .\n\
        0 . . . .\n",
    )
    .unwrap();
    let mut runner = SwarmRunner::new(&scenario, config_with_vision(5)).unwrap();

    runner.step();

    let explorer = runner.explorer(AgentId(0)).unwrap();
    assert_eq!(explorer.state().name(), "TravelExit");
    assert_eq!(explorer.matrix().exit(), Some(WorldPoint::new(4, 4)));
}

#[test]
fn exit_knowledge_spreads_by_merge() {
    init_logging();
    // Agent 0 can see the exit; agent 1 is far outside vision but inside
    // communication range. One tick in, the merge has taught agent 1 the
    // exit and flipped it to TravelExit.
    let scenario = Scenario::from_ascii(
        "\
        E . . . . . .\n\
        . . . . . . .\n\
        0 . . . . . .\n\
        . . . . . . .\n\
        . . . . . . .\n\
        . . . . . . .\n\
        . . . . . . 1\n",
    )
    .unwrap();
    let mut runner = SwarmRunner::new(&scenario, config_with_vision(2)).unwrap();

    runner.step();

    let follower = runner.explorer(AgentId(1)).unwrap();
    assert_eq!(follower.matrix().exit(), Some(WorldPoint::new(0, 6)));
    assert_eq!(follower.state().name(), "TravelExit");
}

#[test]
fn super_agent_reaches_past_the_radius() {
    init_logging();
    // An 8-cell corridor with communication radius 2: the exit-aware
    // agent 0 can only reach agent 1 when its reach is unbounded.
    let map = "E 0 . . . . . 1\n";
    let mut config = config_with_vision(1);
    config.agent.communication_radius = 2;

    let mut bounded = Scenario::from_ascii(map).unwrap();
    bounded.super_agents = 0;
    let mut runner = SwarmRunner::new(&bounded, config).unwrap();
    runner.step();
    assert_eq!(runner.explorer(AgentId(1)).unwrap().matrix().exit(), None);

    let mut unbounded = Scenario::from_ascii(map).unwrap();
    unbounded.super_agents = 1;
    let mut runner = SwarmRunner::new(&unbounded, config).unwrap();
    runner.step();
    assert_eq!(
        runner.explorer(AgentId(1)).unwrap().matrix().exit(),
        Some(WorldPoint::new(0, 0))
    );
}

#[test]
fn obstacle_destroyed_releases_waiting_agent() {
    init_logging();
    // Drive one agent by hand: a HELP pauses it, the destruction
    // broadcast unblocks the pathfinder node and sends it back to the
    // frontier.
    let mut bus = MessageBus::new();
    let mailbox = bus.register(AgentId(0));
    let outsider = AgentId(7);

    let mut world = GridWorld::new(6, 6);
    world.add_agent(AgentId(0), WorldPoint::new(0, 0));
    world.place_obstacle(WorldPoint::new(3, 3));

    let mut config = config_with_vision(4);
    config.grid.width = 6;
    config.grid.height = 6;
    let mut explorer = Explorer::new(
        AgentId(0),
        AgentKind::Normal,
        config,
        WorldPoint::new(0, 0),
        bus.clone(),
        mailbox,
    );

    // Tick 1: the sweep sights the obstacle and blocks its node.
    explorer.tick(&mut world);
    assert!(!explorer.nodes().is_walkable(WorldPoint::new(3, 3)));

    // A blocked peer asks for help: the agent parks.
    bus.send(IndividualMessage {
        sender: outsider,
        receiver: AgentId(0),
        payload: Payload::Help,
    });
    explorer.tick(&mut world);
    assert_eq!(explorer.state().name(), "WaitingForObstacleDestroy");

    // The destruction broadcast arrives.
    bus.send(IndividualMessage {
        sender: outsider,
        receiver: AgentId(0),
        payload: Payload::ObstacleDestroyed(WorldPoint::new(3, 3)),
    });
    explorer.tick(&mut world);
    assert!(explorer.nodes().is_walkable(WorldPoint::new(3, 3)));

    // Next tick the wait resolves into a fresh frontier travel.
    explorer.tick(&mut world);
    assert_eq!(explorer.state().name(), "TravelFrontier");
}

#[test]
fn transient_marks_never_survive_a_tick() {
    init_logging();
    let scenario = Scenario::from_ascii(
        "\
        . . . E\n\
        . # . .\n\
        0 1 . .\n",
    )
    .unwrap();
    let mut runner = SwarmRunner::new(&scenario, config_with_vision(2)).unwrap();

    for _ in 0..5 {
        runner.step();
        for explorer in runner.explorers() {
            let frame = explorer.matrix().frame();
            for x in 0..frame.width() {
                for y in 0..frame.height() {
                    assert!(
                        !explorer.nodes().is_transient(WorldPoint::new(x, y)),
                        "stale transient at ({x}, {y})"
                    );
                }
            }
        }
    }
}

#[test]
fn open_map_swarm_explores_and_leaves() {
    init_logging();
    let scenario = Scenario::from_ascii(
        "\
        . . . . . . E\n\
        . . . . . . .\n\
        . . . . . . .\n\
        0 . . . . . .\n\
        . . . . . . .\n\
        . . . . . . .\n\
        1 . . . . . .\n",
    )
    .unwrap();
    let mut runner = SwarmRunner::new(&scenario, config_with_vision(1)).unwrap();

    let summary = runner.run(1500);

    assert!(
        summary.complete(),
        "only {}/{} agents out after {} ticks",
        summary.finished,
        summary.agents,
        summary.ticks
    );
    // Finished agents are gone from the world too.
    assert_eq!(runner.world().agent_count(), 0);
}

#[test]
fn guardian_breaks_the_wall_to_a_sealed_exit() {
    init_logging();
    // The exit chamber (top-left) is sealed behind a one-cell-thick wall.
    // Agent 1 spawns inside and sights the exit; agent 0 learns it by
    // merge, finds every route walled off, guards the nearest wall cell,
    // and breaks through. Everyone ends up outside.
    let scenario = Scenario::from_ascii(
        "\
        E 1 # .\n\
        # # # .\n\
        0 . . .\n",
    )
    .unwrap();
    let mut config = config_with_vision(1);
    config.coordination.required_breakers = 1;
    let mut runner = SwarmRunner::new(&scenario, config).unwrap();

    let summary = runner.run(300);

    assert!(
        summary.complete(),
        "only {}/{} agents out after {} ticks",
        summary.finished,
        summary.agents,
        summary.ticks
    );
    // At least one wall cell is gone from the world.
    let breached = [
        WorldPoint::new(0, 1),
        WorldPoint::new(1, 1),
        WorldPoint::new(2, 1),
        WorldPoint::new(2, 2),
    ]
    .iter()
    .any(|c| !runner.world().has_obstacle(*c));
    assert!(breached, "the chamber wall is still intact");
}

#[test]
fn quorum_guardian_waits_for_a_recruit() {
    init_logging();
    // Same sealed chamber, but breaking needs two agents. Agent 0 guards;
    // agent 2 arrives, signs up, and the destruction releases it.
    let scenario = Scenario::from_ascii(
        "\
        E 1 # .\n\
        # # # .\n\
        0 . 2 .\n",
    )
    .unwrap();
    let mut config = config_with_vision(1);
    config.coordination.required_breakers = 2;
    let mut runner = SwarmRunner::new(&scenario, config).unwrap();

    let summary = runner.run(400);

    assert!(
        summary.complete(),
        "only {}/{} agents out after {} ticks",
        summary.finished,
        summary.agents,
        summary.ticks
    );
}
