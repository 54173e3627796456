use super::*;

const GROUND_SIZE: f32 = 120.0;
const WHEEL_OFFSETS: [Vec3; 4] = [
    Vec3::new(0.65, 0.0, 0.7),
    Vec3::new(-0.65, 0.0, 0.7),
    Vec3::new(0.65, 0.0, -0.7),
    Vec3::new(-0.65, 0.0, -0.7),
];

#[derive(Component)]
pub struct PlayerCar;

#[derive(Component)]
pub(crate) struct CarWheel;

#[derive(Component)]
pub(crate) struct GroundVisual;

pub(crate) struct BodyPart {
    name: &'static str,
    size: Vec3,
    offset: Vec3,
    color: Color,
    emissive: Option<LinearRgba>,
}

fn body_parts() -> [BodyPart; 9] {
    let shell = Color::srgb_u8(0xf8, 0xb4, 0xc4);
    let bumper = Color::srgb_u8(0xe8, 0xa5, 0xb8);
    let headlight = Color::srgb_u8(0xff, 0xff, 0xd4);
    let taillight = Color::srgb_u8(0xff, 0x6b, 0x6b);
    [
        BodyPart {
            name: "CarBody",
            size: Vec3::new(1.2, 0.4, 2.2),
            offset: Vec3::new(0.0, 0.2, 0.0),
            color: shell,
            emissive: None,
        },
        BodyPart {
            name: "CarCabin",
            size: Vec3::new(1.0, 0.35, 1.2),
            offset: Vec3::new(0.0, 0.55, -0.1),
            color: Color::srgb_u8(0xc9, 0xe4, 0xf8),
            emissive: None,
        },
        BodyPart {
            name: "CarRoof",
            size: Vec3::new(0.9, 0.1, 1.0),
            offset: Vec3::new(0.0, 0.8, -0.1),
            color: shell,
            emissive: None,
        },
        BodyPart {
            name: "CarFrontBumper",
            size: Vec3::new(1.1, 0.2, 0.15),
            offset: Vec3::new(0.0, 0.1, 1.15),
            color: bumper,
            emissive: None,
        },
        BodyPart {
            name: "CarRearBumper",
            size: Vec3::new(1.1, 0.2, 0.15),
            offset: Vec3::new(0.0, 0.1, -1.15),
            color: bumper,
            emissive: None,
        },
        BodyPart {
            name: "CarHeadlightRight",
            size: Vec3::new(0.2, 0.15, 0.05),
            offset: Vec3::new(0.4, 0.25, 1.12),
            color: headlight,
            emissive: Some(LinearRgba::from(headlight) * 0.5),
        },
        BodyPart {
            name: "CarHeadlightLeft",
            size: Vec3::new(0.2, 0.15, 0.05),
            offset: Vec3::new(-0.4, 0.25, 1.12),
            color: headlight,
            emissive: Some(LinearRgba::from(headlight) * 0.5),
        },
        BodyPart {
            name: "CarTaillightRight",
            size: Vec3::new(0.2, 0.1, 0.05),
            offset: Vec3::new(0.4, 0.25, -1.12),
            color: taillight,
            emissive: Some(LinearRgba::from(taillight) * 0.3),
        },
        BodyPart {
            name: "CarTaillightLeft",
            size: Vec3::new(0.2, 0.1, 0.05),
            offset: Vec3::new(-0.4, 0.25, -1.12),
            color: taillight,
            emissive: Some(LinearRgba::from(taillight) * 0.3),
        },
    ]
}

pub(super) fn spawn_vehicle_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    state: Res<VehicleState>,
    existing_car: Query<Entity, With<PlayerCar>>,
    existing_ground: Query<Entity, With<GroundVisual>>,
) {
    if existing_ground.is_empty() {
        commands.spawn((
            Name::new("Ground"),
            GroundVisual,
            Mesh3d(meshes.add(Plane3d::default().mesh().size(GROUND_SIZE, GROUND_SIZE))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: Color::srgb_u8(0xb8, 0xe0, 0xa8),
                perceptual_roughness: 1.0,
                ..default()
            })),
            Transform::IDENTITY,
        ));
    }

    if !existing_car.is_empty() {
        return;
    }

    let tire_mesh = meshes.add(Cylinder::new(0.25, 0.15));
    let hub_mesh = meshes.add(Cylinder::new(0.12, 0.02));
    let tire_material = materials.add(StandardMaterial {
        base_color: Color::srgb_u8(0x4a, 0x4a, 0x4a),
        ..default()
    });
    let hub_material = materials.add(StandardMaterial {
        base_color: Color::srgb_u8(0xc0, 0xc0, 0xc0),
        ..default()
    });
    let axle_rotation = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);

    let car = commands
        .spawn((
            Name::new("PlayerCar"),
            PlayerCar,
            Transform::from_translation(state.position),
            Visibility::default(),
        ))
        .id();

    commands.entity(car).with_children(|parent| {
        for part in body_parts() {
            parent.spawn((
                Name::new(part.name),
                Mesh3d(meshes.add(Cuboid::from_size(part.size))),
                MeshMaterial3d(materials.add(StandardMaterial {
                    base_color: part.color,
                    emissive: part.emissive.unwrap_or(LinearRgba::BLACK),
                    ..default()
                })),
                Transform::from_translation(part.offset),
            ));
        }

        for offset in WHEEL_OFFSETS {
            parent
                .spawn((
                    Name::new("CarWheel"),
                    CarWheel,
                    Transform::from_translation(offset),
                    Visibility::default(),
                ))
                .with_children(|wheel| {
                    wheel.spawn((
                        Mesh3d(tire_mesh.clone()),
                        MeshMaterial3d(tire_material.clone()),
                        Transform::from_rotation(axle_rotation),
                    ));
                    wheel.spawn((
                        Mesh3d(hub_mesh.clone()),
                        MeshMaterial3d(hub_material.clone()),
                        Transform::from_xyz(0.08, 0.0, 0.0).with_rotation(axle_rotation),
                    ));
                });
        }
    });
}

pub(super) fn cleanup_vehicle_scene(
    mut commands: Commands,
    car_query: Query<Entity, With<PlayerCar>>,
    ground_query: Query<Entity, With<GroundVisual>>,
) {
    for entity in &car_query {
        commands.entity(entity).despawn();
    }
    for entity in &ground_query {
        commands.entity(entity).despawn();
    }
}

/// Body yaw and roll come from the integrator; wheels share one spin angle.
pub(crate) fn sync_vehicle_visuals(
    state: Res<VehicleState>,
    dynamics: Res<VehicleDynamics>,
    mut car_query: Query<&mut Transform, (With<PlayerCar>, Without<CarWheel>)>,
    mut wheel_query: Query<&mut Transform, (With<CarWheel>, Without<PlayerCar>)>,
) {
    let Ok(mut car_transform) = car_query.single_mut() else {
        return;
    };

    car_transform.translation = state.position;
    car_transform.rotation =
        Quat::from_euler(EulerRot::YXZ, state.heading, 0.0, dynamics.body_tilt);

    for mut wheel_transform in &mut wheel_query {
        wheel_transform.rotation = Quat::from_rotation_x(state.wheel_rotation);
    }
}
