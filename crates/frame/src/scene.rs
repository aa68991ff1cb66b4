use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use glam::{Mat4, Quat, Vec3};
use physview_assets::{
    AssetError, ImportedModel, box_model, checker_texture, ground_grid, import_obj, load_texture,
    prop_palette,
};
use physview_camera::CameraMode;
use physview_common::{TextureId, TextureImage};
use physview_physics::{BodyRole, PhysicsRegistry, PhysicsService};
use physview_render::{
    InstanceSet, MaterialGroup, MeshData, RenderBackend, RenderError, RenderScene,
};

use crate::config::ViewerConfig;
use crate::orchestrator::FrameError;

const GROUND_HALF_EXTENT: f32 = 40.0;
const GROUND_CELLS: u32 = 16;
const GROUND_LIGHT: [u8; 4] = [128, 138, 112, 255];
const GROUND_DARK: [u8; 4] = [96, 106, 84, 255];
const PROP_HALF_EXTENT: f32 = 0.4;
const PROGRESS_INTERVAL: usize = 500;

/// Deterministic texture picker for props.
#[derive(Debug, Clone)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    /// Uniform-ish index below `len`. `len` must be non-zero.
    pub fn pick(&mut self, len: usize) -> usize {
        (self.next_u64() % len as u64) as usize
    }
}

/// What scene population produced.
#[derive(Debug)]
pub struct LoadedScene {
    pub render: RenderScene,
    pub mode: CameraMode,
    pub prop_textures: Vec<TextureId>,
}

/// Import `path` when configured, otherwise or on failure use `fallback`.
fn model_or(
    config: &ViewerConfig,
    path: Option<&PathBuf>,
    transform: Mat4,
    what: &str,
    fallback: impl FnOnce() -> ImportedModel,
) -> ImportedModel {
    let Some(path) = path else {
        tracing::debug!(what, "no model configured, using generated geometry");
        return fallback();
    };
    let resolved = config.assets.resolve(path);
    match import_obj(&resolved, transform) {
        Ok(model) => model,
        Err(err) => {
            tracing::warn!(
                what,
                path = %resolved.display(),
                %err,
                "model not loaded, using generated geometry"
            );
            fallback()
        }
    }
}

fn texture_or_warn(path: &Path) -> Option<TextureImage> {
    load_texture(path)
        .map_err(|err: AssetError| {
            tracing::warn!(path = %path.display(), %err, "texture not loaded");
        })
        .ok()
}

/// Upload every material group, resolving each diffuse texture once.
fn upload_textured<R: RenderBackend>(
    backend: &mut R,
    model: &ImportedModel,
    cache: &mut BTreeMap<PathBuf, Option<TextureId>>,
) -> Result<MeshData, RenderError> {
    let mut groups = Vec::with_capacity(model.groups.len());
    for group in &model.groups {
        let texture = match &group.texture {
            None => None,
            Some(path) => match cache.get(path) {
                Some(id) => *id,
                None => {
                    let id = match texture_or_warn(path) {
                        Some(image) => Some(backend.upload_texture(&image)?),
                        None => None,
                    };
                    cache.insert(path.clone(), id);
                    id
                }
            },
        };
        groups.push(MaterialGroup {
            vertices: group.vertices.clone(),
            texture,
        });
    }
    Ok(MeshData { groups })
}

fn untextured(model: &ImportedModel) -> MeshData {
    MeshData {
        groups: model
            .groups
            .iter()
            .map(|g| MaterialGroup {
                vertices: g.vertices.clone(),
                texture: None,
            })
            .collect(),
    }
}

/// Load assets, upload them, register every body and commit.
///
/// Runs once at startup; the registry is committed on success.
pub fn populate<P, R>(
    config: &ViewerConfig,
    physics: &mut PhysicsRegistry<P>,
    backend: &mut R,
) -> Result<LoadedScene, FrameError>
where
    P: PhysicsService,
    R: RenderBackend,
{
    let assets = &config.assets;
    let mut render = RenderScene::new();
    let mut texture_cache = BTreeMap::new();

    // Visible world geometry.
    let scene_model = model_or(
        config,
        assets.scene_model.as_ref(),
        Mat4::IDENTITY,
        "scene",
        || ground_grid(GROUND_HALF_EXTENT, GROUND_CELLS),
    );
    let mut mesh = upload_textured(backend, &scene_model, &mut texture_cache)?;
    if mesh.groups.iter().all(|g| g.texture.is_none()) {
        let ground = checker_texture(256, 16, GROUND_LIGHT, GROUND_DARK);
        let id = backend.upload_texture(&ground)?;
        for group in &mut mesh.groups {
            group.texture = Some(id);
        }
    }
    render.add_static(backend.upload_model(&mesh)?, Mat4::IDENTITY);

    // Collision terrain: its own model when given, the visible one otherwise.
    let physics_model = match assets.physics_model.as_ref() {
        Some(_) => model_or(
            config,
            assets.physics_model.as_ref(),
            Mat4::IDENTITY,
            "physics",
            || scene_model.clone(),
        ),
        None => scene_model,
    };

    // Prop textures, then the prop model itself.
    let mut images: Vec<TextureImage> = assets
        .prop_textures
        .iter()
        .filter_map(|p| texture_or_warn(&assets.resolve(p)))
        .collect();
    if images.is_empty() {
        images = prop_palette(config.props.fallback_textures.max(1));
    }
    let prop_textures = images
        .iter()
        .map(|image| backend.upload_texture(image))
        .collect::<Result<Vec<_>, _>>()?;

    let prop_model = model_or(
        config,
        assets.prop_model.as_ref(),
        Mat4::from_scale(Vec3::splat(config.props.model_scale)),
        "prop",
        || box_model(Vec3::splat(PROP_HALF_EXTENT)),
    );
    let prop_gpu = backend.upload_model(&untextured(&prop_model))?;
    let prop_points = prop_model.positions();

    // Bodies.
    physics.set_gravity(config.physics.gravity);
    physics.register_concave(
        Vec3::ZERO,
        Quat::IDENTITY,
        0.0,
        &physics_model.positions(),
        &physics_model.sequential_indices(),
    )?;

    let props = &config.props;
    let total = props.count();
    let mut rng = SplitMix64::new(props.texture_seed);
    let mut instances = InstanceSet::new(prop_gpu.id());
    let mut loaded = 0usize;
    for x in props.grid_min..props.grid_max {
        for z in props.grid_min..props.grid_max {
            for y in 0..props.layers {
                let position = Vec3::new(
                    x as f32 * props.spacing,
                    props.base_height + y as f32 * props.spacing,
                    z as f32 * props.spacing,
                );
                let handle = physics.register_convex(
                    BodyRole::Prop,
                    position,
                    Quat::IDENTITY,
                    props.mass,
                    &prop_points,
                )?;
                instances.push(handle, prop_textures[rng.pick(prop_textures.len())]);
                loaded += 1;
                if loaded % PROGRESS_INTERVAL == 0 || loaded == total {
                    tracing::info!("loading scene ({loaded}/{total})");
                }
            }
        }
    }
    render.add_instances(instances);

    let mode = if config.avatar.enabled {
        let avatar = &config.avatar;
        let model = model_or(
            config,
            assets.avatar_model.as_ref(),
            Mat4::IDENTITY,
            "avatar",
            || box_model(avatar.half_extents),
        );
        let handle = physics.register_convex(
            BodyRole::Avatar,
            avatar.spawn,
            Quat::IDENTITY,
            avatar.mass,
            &model.positions(),
        )?;
        tracing::info!(?handle, spawn = ?avatar.spawn, "avatar registered");
        CameraMode::AvatarFollow(handle)
    } else {
        CameraMode::FreeFly
    };

    physics.commit()?;
    tracing::info!(
        bodies = physics.body_count(),
        props = loaded,
        textures = prop_textures.len(),
        batches = render.batch_count(),
        "scene ready"
    );

    Ok(LoadedScene {
        render,
        mode,
        prop_textures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use physview_common::Viewport;
    use physview_physics::{Phase, SimConfig, SimWorld};
    use physview_render::RecordingRenderer;

    fn small_config() -> ViewerConfig {
        let mut config = ViewerConfig::default();
        config.props.grid_min = -1;
        config.props.grid_max = 1;
        config.props.layers = 2;
        config.props.fallback_textures = 3;
        config
    }

    fn setup() -> (PhysicsRegistry<SimWorld>, RecordingRenderer) {
        (
            PhysicsRegistry::new(SimWorld::new(SimConfig::default())),
            RecordingRenderer::new(Viewport::new(64, 64)),
        )
    }

    #[test]
    fn splitmix_is_deterministic() {
        let mut a = SplitMix64::new(7);
        let mut b = SplitMix64::new(7);
        let xs: Vec<u64> = (0..4).map(|_| a.next_u64()).collect();
        let ys: Vec<u64> = (0..4).map(|_| b.next_u64()).collect();
        assert_eq!(xs, ys);
        assert_ne!(xs[0], xs[1]);
        assert!((0..100).all(|_| a.pick(3) < 3));
    }

    #[test]
    fn generated_scene_registers_everything() {
        let config = small_config();
        let (mut physics, mut backend) = setup();
        let scene = populate(&config, &mut physics, &mut backend).unwrap();

        assert_eq!(physics.phase(), Phase::Committed);
        // Ground plus 2 x 2 x 2 props.
        assert_eq!(physics.body_count(), 9);
        assert_eq!(physics.props().count(), 8);
        assert!(physics.ground().is_some());
        assert_eq!(scene.mode, CameraMode::FreeFly);
        assert_eq!(scene.render.instance_count(), 8);
        assert_eq!(scene.prop_textures.len(), 3);
        assert_eq!(backend.model_count(), 2);
    }

    #[test]
    fn props_stack_on_the_grid() {
        let config = small_config();
        let (mut physics, mut backend) = setup();
        populate(&config, &mut physics, &mut backend).unwrap();
        let heights: Vec<f32> = physics
            .props()
            .map(|r| physics.body(r.handle).unwrap().transform.position.y)
            .collect();
        assert!(heights.contains(&20.0));
        assert!(heights.contains(&21.5));
    }

    #[test]
    fn texture_assignment_follows_the_seed() {
        let config = small_config();
        let textures = |seed: u64| {
            let mut config = config.clone();
            config.props.texture_seed = seed;
            let (mut physics, mut backend) = setup();
            let scene = populate(&config, &mut physics, &mut backend).unwrap();
            scene.render.instances[0]
                .instances()
                .iter()
                .map(|i| i.texture)
                .collect::<Vec<_>>()
        };
        assert_eq!(textures(1), textures(1));
    }

    #[test]
    fn avatar_switches_camera_mode() {
        let mut config = small_config();
        config.avatar.enabled = true;
        let (mut physics, mut backend) = setup();
        let scene = populate(&config, &mut physics, &mut backend).unwrap();
        let handle = physics.avatar().unwrap();
        assert_eq!(scene.mode, CameraMode::AvatarFollow(handle));
        assert_eq!(physics.body(handle).unwrap().transform.position, config.avatar.spawn);
    }

    #[test]
    fn missing_files_fall_back() {
        let mut config = small_config();
        config.assets.root = Some(PathBuf::from("/nonexistent"));
        config.assets.scene_model = Some(PathBuf::from("Scene.obj"));
        config.assets.prop_model = Some(PathBuf::from("barrel.obj"));
        config.assets.prop_textures = vec![PathBuf::from("missing.png")];
        let (mut physics, mut backend) = setup();
        let scene = populate(&config, &mut physics, &mut backend).unwrap();
        assert_eq!(scene.prop_textures.len(), 3);
        assert_eq!(physics.body_count(), 9);
    }
}
