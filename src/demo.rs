use std::time::Duration;

use glam::{Mat4, Vec3};
use id_arena::Arena;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    config::DemoConfig,
    hmd::{ControllerState, EyeView, Hand, HandStates},
    lighting::{PointLight, MAX_LIGHTS},
    math::{Segment, AABB, SPAWN_BOUNDS},
    model::Model,
    rendering::{
        draw_queue::{DrawQueue, FrameParams},
        renderer::SceneShaders,
    },
    scene_graph::{Geode, LineSegment, MatrixTransform, NodeId, Scene},
};

const CO2_HALF_EXTENT: f32 = 1.0;
const O2_HALF_EXTENT: f32 = 0.6;
const FACTORY_HALF_EXTENT: f32 = 1.5;

/// Everything one eye pass needs from outside the demo.
pub struct FrameContext<'a> {
    pub shaders: SceneShaders,
    pub eye: &'a EyeView,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Round {
    Playing,
    /// Every CO2 prop was converted.
    Won,
    /// Too many CO2 props were alive at once.
    Lost,
}

#[derive(Debug, Clone, Copy)]
enum SpawnPoint {
    Random,
    Factory,
}

#[derive(Debug, Clone, Copy)]
struct HandNodes {
    transform: NodeId,
    laser: NodeId,
}

/// The scene driver: owns the scene graph and the gameplay state around it.
///
/// CO2 props are `MatrixTransform`s under `co2_root`, all sharing one CO2
/// model leaf. A prop caught by both active lasers swaps that leaf for the O2
/// one and moves under `o2_root`, keeping its motion. Each hand is a separate
/// root holding its laser line. Detached props are kept as spares and reused
/// by later spawns.
pub struct DemoState {
    pub scene: Scene,
    pub models: Arena<Model>,
    pub lights: [PointLight; MAX_LIGHTS],
    config: DemoConfig,
    rng: StdRng,
    factory: NodeId,
    co2_root: NodeId,
    o2_root: NodeId,
    co2_leaf: NodeId,
    o2_leaf: NodeId,
    hands: [HandNodes; 2],
    spare_props: Vec<NodeId>,
    since_spawn: Duration,
    round: Round,
    score: u32,
}

impl DemoState {
    pub fn new(config: &DemoConfig) -> anyhow::Result<Self> {
        let mut models = Arena::<Model>::new();
        let co2_model = models.alloc(load_model(config, "co2", CO2_HALF_EXTENT));
        let o2_model = models.alloc(load_model(config, "o2", O2_HALF_EXTENT));
        let factory_model = models.alloc(load_model(config, "factory", FACTORY_HALF_EXTENT));

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut scene = Scene::new();
        let co2_root = scene.add_group();
        let o2_root = scene.add_group();
        let co2_leaf = scene.add_geode(Geode::model(co2_model));
        let o2_leaf = scene.add_geode(Geode::model(o2_model));

        let factory = scene.add_transform(MatrixTransform::from_translation(
            config.factory_position,
        ));
        let factory_leaf = scene.add_geode(Geode::model(factory_model));
        scene.add_child(factory, factory_leaf)?;

        let hands = [add_hand(&mut scene, config)?, add_hand(&mut scene, config)?];

        let mut state = Self {
            scene,
            models,
            lights: config.lights,
            config: config.clone(),
            rng,
            factory,
            co2_root,
            o2_root,
            co2_leaf,
            o2_leaf,
            hands,
            spare_props: Vec::new(),
            since_spawn: Duration::ZERO,
            round: Round::Playing,
            score: 0,
        };
        state.start_round()?;

        Ok(state)
    }

    pub fn round(&self) -> Round {
        self.round
    }

    /// CO2 props converted this round.
    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn co2_props(&self) -> &[NodeId] {
        self.scene.children(self.co2_root)
    }

    pub fn o2_props(&self) -> &[NodeId] {
        self.scene.children(self.o2_root)
    }

    pub fn clear_color(&self) -> wgpu::Color {
        match self.round {
            Round::Won => self.config.win_clear_color,
            Round::Playing | Round::Lost => self.config.clear_color,
        }
    }

    /// One gameplay tick. Runs before any eye is drawn and returns whether a
    /// prop was converted.
    pub fn update(&mut self, hands: &HandStates, elapsed: Duration) -> anyhow::Result<bool> {
        for hand in Hand::BOTH {
            self.place_hand(hand, hands.get(hand));
        }

        let mut hit = false;
        if self.round == Round::Playing {
            hit = self.convert_hits()?;
            self.check_round_end()?;
        }

        self.scene.update(self.co2_root);
        self.scene.update(self.o2_root);

        if self.round == Round::Playing {
            self.since_spawn += elapsed;
            if self.since_spawn >= self.config.spawn_interval {
                self.since_spawn = Duration::ZERO;
                self.spawn_co2(SpawnPoint::Factory)?;
            }
        }

        Ok(hit)
    }

    /// Starts a new round once the current one is over. Returns `false` and
    /// changes nothing while still playing.
    pub fn reset(&mut self) -> anyhow::Result<bool> {
        if self.round == Round::Playing {
            return Ok(false);
        }

        for root in [self.co2_root, self.o2_root] {
            for prop in self.scene.children(root).to_vec() {
                self.scene.remove_child(root, prop);
                self.spare_props.push(prop);
            }
        }

        self.score = 0;
        self.start_round()?;
        log::info!("New round, scene holds {} nodes", self.scene.len());

        Ok(true)
    }

    pub fn draw(&mut self, context: &FrameContext, queue: &mut DrawQueue) {
        let frame = FrameParams {
            shader: context.shaders.mesh,
            projection: context.eye.projection,
            view: context.eye.view,
        };
        for root in [self.factory, self.co2_root, self.o2_root] {
            self.scene.draw_with(root, Mat4::IDENTITY, &frame, queue);
        }

        let line_frame = FrameParams {
            shader: context.shaders.line,
            ..frame
        };
        for hand in self.hands {
            self.scene
                .draw_with(hand.transform, Mat4::IDENTITY, &line_frame, queue);
        }
    }

    fn start_round(&mut self) -> anyhow::Result<()> {
        self.round = Round::Playing;
        self.since_spawn = Duration::ZERO;

        for _ in 0..self.config.prop_count {
            self.spawn_co2(SpawnPoint::Random)?;
        }

        log::info!("Round started with {} CO2 props", self.co2_props().len());

        Ok(())
    }

    fn place_hand(&mut self, hand: Hand, controller: &ControllerState) {
        let nodes = self.hands[hand as usize];

        if let Some(transform) = self.scene.transform_mut(nodes.transform) {
            transform.set_matrix(controller.pose.matrix());
        }
        if let Some(line) = self
            .scene
            .geode_mut(nodes.laser)
            .and_then(Geode::as_line_mut)
        {
            line.active = controller.trigger;
        }

        // Resolve the laser's world transform for hit testing.
        self.scene.draw(nodes.transform, Mat4::IDENTITY);
    }

    fn laser_segment(&self, laser: NodeId) -> Option<Segment> {
        let geode = self.scene.geode(laser)?;
        geode.as_line()?.active.then(|| geode.world_segment()).flatten()
    }

    // Hits are collected first and converted afterwards, so the CO2 root's
    // child list is never modified while it is being walked.
    fn convert_hits(&mut self) -> anyhow::Result<bool> {
        let [Some(left), Some(right)] = self.hands.map(|hand| self.laser_segment(hand.laser))
        else {
            return Ok(false);
        };

        let radius = self.config.collision_radius;
        let scene = &self.scene;
        let hits: Vec<NodeId> = scene
            .children(self.co2_root)
            .iter()
            .copied()
            .filter(|&prop| {
                scene.transform(prop).is_some_and(|transform| {
                    let position = transform.position();
                    left.distance_to_point(position) < radius
                        && right.distance_to_point(position) < radius
                })
            })
            .collect();

        for &prop in &hits {
            self.convert_to_o2(prop)?;
        }

        Ok(!hits.is_empty())
    }

    fn convert_to_o2(&mut self, prop: NodeId) -> anyhow::Result<()> {
        self.scene.remove_child(self.co2_root, prop);
        self.scene.remove_child(prop, self.co2_leaf);
        self.scene.add_child(prop, self.o2_leaf)?;
        self.scene.add_child(self.o2_root, prop)?;

        self.score += 1;
        log::info!("CO2 converted, score {}", self.score);

        Ok(())
    }

    fn check_round_end(&mut self) -> anyhow::Result<()> {
        let remaining = self.co2_props().len();

        if remaining == 0 {
            self.round = Round::Won;
            log::info!("Every CO2 prop converted, round won with score {}", self.score);
        } else if remaining > self.config.max_props {
            for _ in 0..self.config.overflow_props {
                self.spawn_co2(SpawnPoint::Random)?;
            }
            self.round = Round::Lost;
            log::info!("{remaining} CO2 props alive, round lost");
        }

        Ok(())
    }

    fn spawn_co2(&mut self, point: SpawnPoint) -> anyhow::Result<NodeId> {
        let position = match point {
            SpawnPoint::Random => random_point(&mut self.rng, &SPAWN_BOUNDS),
            SpawnPoint::Factory => self.config.factory_spawn_point,
        };
        let fresh = random_co2(&mut self.rng, position, self.config.prop_scale);

        let prop = match self.spare_props.pop() {
            Some(spare) if self.scene.transform(spare).is_some() => {
                if let Some(transform) = self.scene.transform_mut(spare) {
                    *transform = fresh;
                }
                spare
            }
            _ => self.scene.add_transform(fresh),
        };

        self.scene.add_child(prop, self.co2_leaf)?;
        self.scene.add_child(self.co2_root, prop)?;

        Ok(prop)
    }
}

fn add_hand(scene: &mut Scene, config: &DemoConfig) -> anyhow::Result<HandNodes> {
    let transform = scene.add_transform(MatrixTransform::new(Mat4::IDENTITY));
    let laser = scene.add_geode(Geode::line(LineSegment::new(
        Vec3::ZERO,
        Vec3::NEG_Z * config.laser_length,
        config.laser_color,
    )));
    scene.add_child(transform, laser)?;

    Ok(HandNodes { transform, laser })
}

fn load_model(config: &DemoConfig, name: &str, half_extent: f32) -> Model {
    if let Some(dir) = &config.model_dir {
        match Model::load_gltf(dir.join(format!("{name}.gltf"))) {
            Ok(model) => return model,
            Err(e) => log::warn!("Using a cube for {name}: {e:#}"),
        }
    }

    Model::cube(name, half_extent)
}

fn random_point(rng: &mut StdRng, bounds: &AABB) -> Vec3 {
    Vec3::new(
        rng.gen_range(bounds.min.x..=bounds.max.x),
        rng.gen_range(bounds.min.y..=bounds.max.y),
        rng.gen_range(bounds.min.z..=bounds.max.z),
    )
}

/// A slowly tumbling CO2 prop at `position`, drifting mostly upwards.
fn random_co2(rng: &mut StdRng, position: Vec3, scale: f32) -> MatrixTransform {
    let degrees_per_tick = rng.gen_range(-1.0..1.0);
    let axis = Vec3::new(
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
    );
    let velocity = Vec3::new(
        rng.gen_range(-1.0..1.0),
        rng.gen_range(0.0..1.0),
        rng.gen_range(-1.0..1.0),
    ) / 50.0;

    let mut transform = MatrixTransform::from_translation(position)
        .with_spin(degrees_per_tick, axis)
        .with_velocity(velocity);
    transform.scale(scale);

    transform
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use approx::assert_abs_diff_eq;
    use glam::Quat;

    use super::*;
    use crate::{
        config::HmdConfig,
        hmd::{DesktopHmd, HeadMountedDisplay, Pose},
        rendering::{draw_queue::DrawCommand, shader_loader::PipelineCacheEntry},
    };

    const TICK: Duration = Duration::from_millis(10);

    fn config() -> DemoConfig {
        DemoConfig {
            model_dir: None,
            seed: Some(7),
            prop_count: 3,
            ..Default::default()
        }
    }

    fn controller(pose: Pose, trigger: bool) -> ControllerState {
        ControllerState { pose, trigger }
    }

    /// Both hands at the origin aiming down -Z.
    fn aiming_down_z(left: bool, right: bool) -> HandStates {
        let pose = Pose::new(Vec3::ZERO, Quat::IDENTITY);
        HandStates {
            left: controller(pose, left),
            right: controller(pose, right),
            button: false,
        }
    }

    /// Both hands far behind the play area aiming away from it.
    fn aiming_away(trigger: bool) -> HandStates {
        let pose = Pose::new(Vec3::new(0.0, 0.0, 50.0), Quat::from_rotation_y(PI));
        HandStates {
            left: controller(pose, trigger),
            right: controller(pose, trigger),
            button: false,
        }
    }

    fn shaders() -> SceneShaders {
        let mut pipelines = Arena::<PipelineCacheEntry>::new();
        SceneShaders {
            mesh: pipelines.alloc(PipelineCacheEntry::default()),
            line: pipelines.alloc(PipelineCacheEntry::default()),
        }
    }

    /// Puts the first CO2 prop on the lasers' path, drifting along +x, and
    /// parks every other one far from it without motion.
    fn line_up(state: &mut DemoState) -> NodeId {
        let props = state.co2_props().to_vec();
        for (index, &prop) in props.iter().enumerate() {
            let transform = if index == 0 {
                MatrixTransform::from_translation(Vec3::new(0.0, 0.0, -5.0))
                    .with_velocity(Vec3::new(0.1, 0.0, 0.0))
            } else {
                MatrixTransform::from_translation(Vec3::new(8.0, 8.0, -2.0 - index as f32))
            };
            *state.scene.transform_mut(prop).unwrap() = transform;
            state.scene.add_child(prop, state.co2_leaf).unwrap();
        }
        props[0]
    }

    #[test]
    fn round_starts_with_random_co2_props() {
        let state = DemoState::new(&config()).unwrap();

        assert_eq!(state.round(), Round::Playing);
        assert_eq!(state.co2_props().len(), 3);
        assert!(state.o2_props().is_empty());
        for &prop in state.co2_props() {
            let transform = state.scene.transform(prop).unwrap();
            assert!(SPAWN_BOUNDS.contains_point(transform.position()));
            assert_eq!(state.scene.children(prop), &[state.co2_leaf]);
        }

        let factory = state.scene.transform(state.factory).unwrap();
        assert_eq!(factory.position(), Vec3::new(0.0, -10.0, -15.0));
        assert_eq!(state.scene.children(state.factory).len(), 1);
    }

    #[test]
    fn same_seed_spawns_the_same_props() {
        let positions = |state: &DemoState| -> Vec<Vec3> {
            state
                .co2_props()
                .iter()
                .map(|&prop| state.scene.transform(prop).unwrap().position())
                .collect()
        };

        let first = DemoState::new(&config()).unwrap();
        let second = DemoState::new(&config()).unwrap();
        assert_eq!(positions(&first), positions(&second));
    }

    #[test]
    fn both_lasers_convert_co2_to_o2() {
        let mut state = DemoState::new(&config()).unwrap();
        let target = line_up(&mut state);

        assert!(state.update(&aiming_down_z(true, true), TICK).unwrap());

        assert_eq!(state.score(), 1);
        assert_eq!(state.co2_props().len(), 2);
        assert_eq!(state.o2_props(), &[target]);
        assert_eq!(state.scene.children(target), &[state.o2_leaf]);

        // The converted prop keeps its motion under the O2 root.
        let moved = state.scene.transform(target).unwrap().position();
        assert_abs_diff_eq!(moved, Vec3::new(0.1, 0.0, -5.0), epsilon = 1e-5);

        assert!(!state.update(&aiming_down_z(true, true), TICK).unwrap());
        let moved_again = state.scene.transform(target).unwrap().position();
        assert_abs_diff_eq!(moved_again.x, 0.2, epsilon = 1e-5);
        assert_eq!(state.round(), Round::Playing);
    }

    #[test]
    fn one_laser_is_not_enough() {
        let mut state = DemoState::new(&config()).unwrap();
        line_up(&mut state);

        assert!(!state.update(&aiming_down_z(true, false), TICK).unwrap());
        assert!(!state.update(&aiming_down_z(false, true), TICK).unwrap());

        let mut split = aiming_down_z(true, true);
        split.right.pose = Pose::new(Vec3::ZERO, Quat::from_rotation_x(PI / 2.0));
        assert!(!state.update(&split, TICK).unwrap());

        assert_eq!(state.score(), 0);
        assert_eq!(state.co2_props().len(), 3);
        assert!(state.o2_props().is_empty());
    }

    #[test]
    fn factory_releases_co2_on_an_interval() {
        let mut state = DemoState::new(&config()).unwrap();

        state.update(&aiming_away(false), Duration::from_millis(1000)).unwrap();
        assert_eq!(state.co2_props().len(), 3);

        state.update(&aiming_away(false), Duration::from_millis(500)).unwrap();
        assert_eq!(state.co2_props().len(), 4);

        let newest = *state.co2_props().last().unwrap();
        let transform = state.scene.transform(newest).unwrap();
        assert_abs_diff_eq!(transform.position(), Vec3::new(0.0, -9.0, -15.0), epsilon = 1e-5);
        assert!(transform.velocity().y >= 0.0);

        state.update(&aiming_away(false), Duration::from_millis(1000)).unwrap();
        assert_eq!(state.co2_props().len(), 4);
    }

    #[test]
    fn converting_every_co2_wins_and_reset_starts_over() {
        let mut state = DemoState::new(&DemoConfig {
            prop_count: 1,
            ..config()
        })
        .unwrap();
        let target = line_up(&mut state);
        let won_color = state.config.win_clear_color;

        assert!(state.update(&aiming_down_z(true, true), TICK).unwrap());
        assert_eq!(state.round(), Round::Won);
        assert_eq!(state.clear_color(), won_color);

        // Nothing spawns or converts once the round is over.
        state.update(&aiming_away(false), Duration::from_secs(5)).unwrap();
        assert!(state.co2_props().is_empty());

        let nodes = state.scene.len();
        assert!(state.reset().unwrap());

        assert_eq!(state.round(), Round::Playing);
        assert_eq!(state.score(), 0);
        assert_eq!(state.co2_props(), &[target]);
        assert_eq!(state.scene.children(target), &[state.co2_leaf]);
        assert!(state.o2_props().is_empty());
        assert_eq!(state.clear_color(), state.config.clear_color);
        assert_eq!(state.scene.len(), nodes);
    }

    #[test]
    fn too_many_co2_loses_and_floods_the_scene() {
        let mut state = DemoState::new(&DemoConfig {
            prop_count: 4,
            max_props: 3,
            overflow_props: 20,
            ..config()
        })
        .unwrap();

        assert!(!state.update(&aiming_away(false), TICK).unwrap());
        assert_eq!(state.round(), Round::Lost);
        assert_eq!(state.co2_props().len(), 24);
        assert_eq!(state.clear_color(), state.config.clear_color);

        state.update(&aiming_away(false), Duration::from_secs(5)).unwrap();
        assert_eq!(state.co2_props().len(), 24);

        let nodes = state.scene.len();
        assert!(state.reset().unwrap());
        assert_eq!(state.co2_props().len(), 4);
        assert_eq!(state.scene.len(), nodes);
    }

    #[test]
    fn reset_is_ignored_while_playing() {
        let mut state = DemoState::new(&config()).unwrap();
        let before = state.co2_props().to_vec();

        assert!(!state.reset().unwrap());
        assert_eq!(state.co2_props(), before.as_slice());
    }

    #[test]
    fn draw_emits_scene_then_lasers() {
        let mut state = DemoState::new(&config()).unwrap();
        let shaders = shaders();
        let hmd = DesktopHmd::new(HmdConfig::default());
        let [eye, _] = hmd.eye_views(1280, 720);
        let context = FrameContext {
            shaders,
            eye: &eye,
        };

        state.update(&aiming_away(false), TICK).unwrap();
        let mut queue = DrawQueue::new();
        state.draw(&context, &mut queue);

        // The factory and three CO2 props, no inactive lasers.
        assert_eq!(queue.len(), 4);
        assert!(queue
            .commands()
            .iter()
            .all(|command| command.frame().shader == shaders.mesh));

        state.update(&aiming_away(true), TICK).unwrap();
        queue.clear();
        state.draw(&context, &mut queue);

        let lasers = &queue.commands()[4..];
        assert_eq!(lasers.len(), 2);
        for laser in lasers {
            assert!(matches!(laser, DrawCommand::Line { .. }));
            assert_eq!(laser.frame().shader, shaders.line);
            assert_eq!(laser.frame().view, eye.view);
        }
    }
}
