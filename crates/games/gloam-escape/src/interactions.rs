//! Player-world interactions run after movement each tick, plus the
//! item/lever commands. Every command is a silent no-op (returning `false`)
//! when the current state does not allow it.

use gloam_core::{Aabb, Countdown, Outbox, Size, Vec2};

use crate::config::EscapeConfig;
use crate::events::SimEvent;
use crate::level::LevelState;
use crate::world::{GateStatus, ItemState, Projectile, SwitchKind, gates_satisfied};

/// Reach used for "touching" checks against things the player cannot
/// overlap, such as closed doors.
const CONTACT_SLOP: f32 = 1.0;

fn touches(a: &Aabb, b: &Aabb) -> bool {
    let grown = Aabb::new(
        b.x - CONTACT_SLOP,
        b.y - CONTACT_SLOP,
        b.width + 2.0 * CONTACT_SLOP,
        b.height + 2.0 * CONTACT_SLOP,
    );
    a.overlaps(&grown)
}

pub fn gate_status(level: &LevelState) -> GateStatus {
    GateStatus {
        pressed_switches: level
            .switches
            .iter()
            .filter(|s| s.pressed)
            .map(|s| s.id)
            .collect(),
        key_held: level.player.has_key,
        flow_solved: level.flow.as_ref().is_some_and(|f| f.is_solved()),
        sensors_lit: level.optics.all_sensors_lit(),
        boss_defeated: level.boss_defeated,
    }
}

pub fn collect_keys(level: &mut LevelState, events: &mut Outbox<SimEvent>) {
    let player = level.player.rect;
    for key in level.keys.iter_mut().filter(|k| !k.collected) {
        if key.rect.overlaps(&player) {
            key.collected = true;
            level.player.has_key = true;
            events.push(SimEvent::KeyCollected { id: key.id });
        }
    }
}

/// Pressure plates are down while the player or a resting item sits on them.
pub fn update_pressure_plates(level: &mut LevelState) {
    let player = level.player.rect;
    let items = &level.items;
    for plate in level
        .switches
        .iter_mut()
        .filter(|s| s.kind == SwitchKind::PressurePlate)
    {
        plate.pressed = plate.rect.overlaps(&player)
            || items
                .iter()
                .any(|i| i.state == ItemState::Floor && i.rect.overlaps(&plate.rect));
    }
}

pub fn update_doors(level: &mut LevelState, events: &mut Outbox<SimEvent>) {
    let status = gate_status(level);
    let player = level.player.rect;
    for door in &mut level.doors {
        if door.requires_key {
            if !door.open && level.player.has_key && touches(&player, &door.rect) {
                door.open = true;
                level.player.has_key = false;
                tracing::debug!(door = door.id, "Key door unlocked");
                events.push(SimEvent::DoorOpened { id: door.id });
            }
            continue;
        }
        if !door.is_gated() {
            continue;
        }
        let want_open = gates_satisfied(&door.opens_when, &status);
        if want_open && !door.open {
            door.open = true;
            events.push(SimEvent::DoorOpened { id: door.id });
        } else if !want_open && door.open && !door.rect.overlaps(&player) {
            door.open = false;
            events.push(SimEvent::DoorClosed { id: door.id });
        }
    }
}

pub fn update_teleporters(
    level: &mut LevelState,
    delta_ms: f32,
    config: &EscapeConfig,
    events: &mut Outbox<SimEvent>,
) {
    let mut destination = None;
    for tp in &mut level.teleporters {
        tp.cooldown.tick(delta_ms);
        if tp.cooldown.is_running() || !tp.sender.overlaps(&level.player.rect) {
            tp.charge_ms = 0.0;
            continue;
        }
        tp.charge_ms += delta_ms;
        if destination.is_none() && tp.charge_ms >= tp.activation_ms {
            tp.charge_ms = 0.0;
            tp.cooldown = Countdown::new(config.session.teleport_cooldown_ms);
            destination = Some((tp.id, tp.receiver.center()));
        }
    }
    if let Some((id, center)) = destination {
        let size = level.player.rect.size();
        level.player.rect = Aabb::centered(center, size).clamped_inside(&level.bounds);
        level.player.velocity = Vec2::ZERO;
        // Arriving on a linked sender must not bounce the player straight back.
        for tp in &mut level.teleporters {
            if tp.sender.overlaps(&level.player.rect) {
                tp.cooldown = Countdown::new(config.session.teleport_cooldown_ms);
            }
        }
        tracing::debug!(teleporter = id, "Player teleported");
        events.push(SimEvent::Teleported { id });
    }
}

fn hit_player(level: &mut LevelState, config: &EscapeConfig, events: &mut Outbox<SimEvent>) {
    if level.player.take_hit(config.player.hit_grace_ms) {
        events.push(SimEvent::PlayerHit {
            health: level.player.health,
        });
        if !level.player.is_alive() {
            events.push(SimEvent::PlayerDied);
        }
    }
}

/// One hit at most per tick: the grace window covers the rest.
pub fn apply_contact_damage(
    level: &mut LevelState,
    config: &EscapeConfig,
    events: &mut Outbox<SimEvent>,
) {
    let player = level.player.rect;
    let touched = level
        .adversaries
        .iter()
        .any(|a| a.is_harmful() && a.body.rect.overlaps(&player));
    if touched {
        hit_player(level, config, events);
    }
}

/// Move projectiles, dropping expired or blocked ones. A projectile that
/// reaches the player is consumed whether or not the hit lands.
pub fn update_projectiles(
    level: &mut LevelState,
    delta_ms: f32,
    config: &EscapeConfig,
    events: &mut Outbox<SimEvent>,
) {
    if level.projectiles.is_empty() {
        return;
    }
    let solids = level.solids();
    let bounds = level.bounds;
    let player = level.player.rect;
    let mut hits = 0;
    level.projectiles.retain_mut(|p| {
        if !p.advance(delta_ms, &solids, &bounds) {
            return false;
        }
        if p.rect.overlaps(&player) {
            hits += 1;
            return false;
        }
        true
    });
    if hits > 0 {
        hit_player(level, config, events);
    }
}

pub fn spawn_projectile(
    level: &mut LevelState,
    origin: Vec2,
    velocity: Vec2,
    source: u32,
    config: &EscapeConfig,
) {
    let size = config.adversary.projectile_size;
    let id = level.allocate_id();
    level.projectiles.push(Projectile {
        id,
        rect: Aabb::centered(origin, Size::new(size, size)),
        velocity,
        ttl_ms: config.adversary.projectile_ttl_ms,
        source,
    });
}

/// Carry held items along and fly thrown ones. Landing makes a noise.
pub fn update_items(level: &mut LevelState, delta_ms: f32, events: &mut Outbox<SimEvent>) {
    let solids = level.solids();
    let bounds = level.bounds;
    let holder = level.player.center();
    let dt = delta_ms / 1000.0;
    for item in &mut level.items {
        match item.state {
            ItemState::Floor => {},
            ItemState::Carried => {
                item.rect = Aabb::centered(holder, item.rect.size());
            },
            ItemState::Thrown { target, velocity } => {
                let to = target - item.rect.center();
                let step = velocity * dt;
                let landed_at = if to.length() <= step.length() {
                    let at_target = Aabb::centered(target, item.rect.size());
                    if solids.iter().any(|s| s.overlaps(&at_target)) || !bounds.contains(&at_target)
                    {
                        Some(item.rect)
                    } else {
                        Some(at_target)
                    }
                } else {
                    let next = item.rect.translated(step);
                    if !step.is_finite()
                        || solids.iter().any(|s| s.overlaps(&next))
                        || !bounds.contains(&next)
                    {
                        Some(item.rect)
                    } else {
                        item.rect = next;
                        None
                    }
                };
                if let Some(rect) = landed_at {
                    item.rect = rect;
                    item.state = ItemState::Floor;
                    let position = rect.center();
                    level.pending_noise = Some(position);
                    events.push(SimEvent::ItemLanded {
                        id: item.id,
                        position,
                    });
                }
            },
        }
    }
}

pub fn exit_reached(level: &LevelState) -> bool {
    let Some(exit) = &level.exit else {
        return false;
    };
    exit.rect.overlaps(&level.player.rect) && gates_satisfied(&exit.requires, &gate_status(level))
}

fn in_reach(level: &LevelState, point: Vec2, config: &EscapeConfig) -> bool {
    level.player.center().distance(point) <= config.player.interaction_range
}

/// Flip a lever the player can reach. Levers marked `requires_light` only
/// work while their lighting quadrant is lit.
pub fn toggle_lever(
    level: &mut LevelState,
    id: u32,
    config: &EscapeConfig,
    events: &mut Outbox<SimEvent>,
) -> bool {
    let Some(index) = level.switches.iter().position(|s| s.id == id) else {
        return false;
    };
    let lever = &level.switches[index];
    let center = lever.rect.center();
    if lever.kind != SwitchKind::Lever || !in_reach(level, center, config) {
        return false;
    }
    if lever.requires_light && !level.ambient.is_lit_at(center, &level.bounds) {
        tracing::debug!(lever = id, "Lever is in the dark");
        return false;
    }
    let lever = &mut level.switches[index];
    lever.pressed = !lever.pressed;
    events.push(SimEvent::LeverToggled {
        id,
        on: lever.pressed,
    });
    true
}

/// Pick up the nearest floor item in reach. Hands must be empty.
pub fn pick_up(level: &mut LevelState, config: &EscapeConfig, events: &mut Outbox<SimEvent>) -> bool {
    if level.player.carried_item.is_some() {
        return false;
    }
    let center = level.player.center();
    let nearest = level
        .items
        .iter_mut()
        .filter(|i| i.state == ItemState::Floor)
        .map(|i| (i.rect.center().distance(center), i))
        .filter(|(d, _)| *d <= config.player.interaction_range)
        .min_by(|a, b| a.0.total_cmp(&b.0));
    let Some((_, item)) = nearest else {
        return false;
    };
    item.state = ItemState::Carried;
    item.rect = Aabb::centered(center, item.rect.size());
    level.player.carried_item = Some(item.id);
    events.push(SimEvent::ItemPickedUp { id: item.id });
    true
}

pub fn drop_item(level: &mut LevelState, events: &mut Outbox<SimEvent>) -> bool {
    let Some(id) = level.player.carried_item else {
        return false;
    };
    let center = level.player.center();
    let Some(item) = level.items.iter_mut().find(|i| i.id == id) else {
        level.player.carried_item = None;
        return false;
    };
    item.state = ItemState::Floor;
    item.rect = Aabb::centered(center, item.rect.size());
    level.player.carried_item = None;
    events.push(SimEvent::ItemDropped { id });
    true
}

/// Throw the carried item toward `target` (a point in level space).
pub fn throw_item(
    level: &mut LevelState,
    target: Vec2,
    config: &EscapeConfig,
    events: &mut Outbox<SimEvent>,
) -> bool {
    let Some(id) = level.player.carried_item else {
        return false;
    };
    if !target.is_finite() {
        return false;
    }
    let center = level.player.center();
    let direction = (target - center).normalize_or_zero();
    if direction.is_zero() {
        return false;
    }
    let Some(item) = level.items.iter_mut().find(|i| i.id == id) else {
        level.player.carried_item = None;
        return false;
    };
    item.rect = Aabb::centered(center, item.rect.size());
    item.state = ItemState::Thrown {
        target,
        velocity: direction * config.player.throw_speed,
    };
    level.player.carried_item = None;
    events.push(SimEvent::ItemThrown { id, target });
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::LevelTemplate;
    use crate::world::{Door, Gate, Item, KeyPickup, Switch, Teleporter};

    fn level() -> LevelState {
        let template = LevelTemplate::from_json(
            r#"{ "name": "t", "width": 800, "height": 600, "spawn": { "x": 100, "y": 100 } }"#,
        )
        .unwrap();
        LevelState::from_template(&template, &EscapeConfig::default())
    }

    fn lever(id: u32, x: f32, y: f32) -> Switch {
        Switch {
            id,
            rect: Aabb::new(x, y, 16.0, 16.0),
            kind: SwitchKind::Lever,
            pressed: false,
            label: None,
            requires_light: false,
        }
    }

    #[test]
    fn key_door_opens_on_contact_and_consumes_key() {
        let mut lvl = level();
        let mut out = Outbox::new();
        lvl.keys.push(KeyPickup {
            id: 1,
            rect: Aabb::new(105.0, 105.0, 8.0, 8.0),
            collected: false,
        });
        lvl.doors.push(Door {
            id: 2,
            rect: Aabb::new(124.0, 80.0, 10.0, 60.0),
            open: false,
            requires_key: true,
            opens_when: Vec::new(),
        });
        update_doors(&mut lvl, &mut out);
        assert!(!lvl.doors[0].open, "no key yet");

        collect_keys(&mut lvl, &mut out);
        assert!(lvl.player.has_key);
        update_doors(&mut lvl, &mut out);
        assert!(lvl.doors[0].open);
        assert!(!lvl.player.has_key);
        assert_eq!(
            out.drain(),
            vec![SimEvent::KeyCollected { id: 1 }, SimEvent::DoorOpened { id: 2 }]
        );
    }

    #[test]
    fn gated_door_never_closes_on_player() {
        let mut lvl = level();
        let mut out = Outbox::new();
        lvl.switches.push(lever(5, 90.0, 90.0));
        lvl.switches[0].pressed = true;
        lvl.doors.push(Door {
            id: 3,
            rect: Aabb::new(100.0, 100.0, 30.0, 30.0),
            open: false,
            requires_key: false,
            opens_when: vec![Gate::SwitchPressed { id: 5 }],
        });
        update_doors(&mut lvl, &mut out);
        assert!(lvl.doors[0].open);

        lvl.switches[0].pressed = false;
        update_doors(&mut lvl, &mut out);
        assert!(lvl.doors[0].open, "player is standing in the doorway");

        lvl.player.rect = lvl.player.rect.with_position(Vec2::new(300.0, 300.0));
        update_doors(&mut lvl, &mut out);
        assert!(!lvl.doors[0].open);
    }

    #[test]
    fn pressure_plate_held_by_item() {
        let mut lvl = level();
        let mut plate = lever(1, 400.0, 400.0);
        plate.kind = SwitchKind::PressurePlate;
        lvl.switches.push(plate);
        lvl.items.push(Item {
            id: 9,
            rect: Aabb::new(402.0, 402.0, 8.0, 8.0),
            state: ItemState::Floor,
        });
        update_pressure_plates(&mut lvl);
        assert!(lvl.switches[0].pressed);
        lvl.items[0].state = ItemState::Carried;
        update_pressure_plates(&mut lvl);
        assert!(!lvl.switches[0].pressed);
    }

    #[test]
    fn lever_needs_reach_and_light() {
        let cfg = EscapeConfig::default();
        let mut lvl = level();
        let mut out = Outbox::new();
        lvl.switches.push(lever(1, 500.0, 500.0));
        assert!(!toggle_lever(&mut lvl, 1, &cfg, &mut out));

        lvl.switches.push(lever(2, 120.0, 120.0));
        lvl.switches[1].requires_light = true;
        lvl.ambient.north_west = false;
        assert!(!toggle_lever(&mut lvl, 2, &cfg, &mut out));
        lvl.ambient.north_west = true;
        assert!(toggle_lever(&mut lvl, 2, &cfg, &mut out));
        assert!(lvl.switches[1].pressed);
        assert_eq!(out.drain(), vec![SimEvent::LeverToggled { id: 2, on: true }]);
    }

    #[test]
    fn teleporter_charges_then_cools_down() {
        let cfg = EscapeConfig::default();
        let mut lvl = level();
        let mut out = Outbox::new();
        lvl.teleporters.push(Teleporter {
            id: 4,
            sender: Aabb::new(90.0, 90.0, 50.0, 50.0),
            receiver: Aabb::new(600.0, 400.0, 50.0, 50.0),
            activation_ms: 100.0,
            charge_ms: 0.0,
            cooldown: Countdown::expired(),
        });
        for _ in 0..6 {
            update_teleporters(&mut lvl, 16.0, &cfg, &mut out);
        }
        assert_eq!(lvl.player.center(), Vec2::new(112.0, 112.0), "96 ms is not enough");
        update_teleporters(&mut lvl, 16.0, &cfg, &mut out);
        assert_eq!(lvl.player.center(), Vec2::new(625.0, 425.0));
        assert_eq!(out.drain(), vec![SimEvent::Teleported { id: 4 }]);
        assert!(lvl.teleporters[0].cooldown.is_running());
    }

    #[test]
    fn pick_up_throw_and_land() {
        let cfg = EscapeConfig::default();
        let mut lvl = level();
        let mut out = Outbox::new();
        lvl.items.push(Item {
            id: 7,
            rect: Aabb::new(130.0, 110.0, 10.0, 10.0),
            state: ItemState::Floor,
        });
        assert!(!drop_item(&mut lvl, &mut out));
        assert!(pick_up(&mut lvl, &cfg, &mut out));
        assert!(!pick_up(&mut lvl, &cfg, &mut out), "hands are full");
        assert_eq!(lvl.player.carried_item, Some(7));

        let target = Vec2::new(312.0, 112.0);
        assert!(throw_item(&mut lvl, target, &cfg, &mut out));
        assert_eq!(lvl.player.carried_item, None);
        for _ in 0..60 {
            update_items(&mut lvl, 16.0, &mut out);
        }
        assert_eq!(lvl.items[0].state, ItemState::Floor);
        assert_eq!(lvl.items[0].rect.center(), target);
        assert_eq!(lvl.pending_noise, Some(target));
        assert!(out.drain().contains(&SimEvent::ItemLanded {
            id: 7,
            position: target
        }));
    }

    #[test]
    fn thrown_item_stops_at_wall() {
        let cfg = EscapeConfig::default();
        let mut lvl = level();
        let mut out = Outbox::new();
        lvl.walls.push(Aabb::new(200.0, 0.0, 20.0, 600.0));
        lvl.items.push(Item {
            id: 1,
            rect: Aabb::new(0.0, 0.0, 10.0, 10.0),
            state: ItemState::Carried,
        });
        lvl.player.carried_item = Some(1);
        assert!(throw_item(&mut lvl, Vec2::new(500.0, 112.0), &cfg, &mut out));
        for _ in 0..60 {
            update_items(&mut lvl, 16.0, &mut out);
        }
        assert_eq!(lvl.items[0].state, ItemState::Floor);
        assert!(lvl.items[0].rect.right() <= 200.0);
    }

    #[test]
    fn projectile_hit_costs_health_once() {
        let cfg = EscapeConfig::default();
        let mut lvl = level();
        let mut out = Outbox::new();
        let center = lvl.player.center();
        spawn_projectile(&mut lvl, center, Vec2::new(10.0, 0.0), 3, &cfg);
        spawn_projectile(&mut lvl, center, Vec2::new(-10.0, 0.0), 3, &cfg);
        update_projectiles(&mut lvl, 16.0, &cfg, &mut out);
        assert!(lvl.projectiles.is_empty());
        assert_eq!(lvl.player.health, cfg.player.max_health - 1);
        assert_eq!(out.drain(), vec![SimEvent::PlayerHit { health: 2 }]);
    }
}
