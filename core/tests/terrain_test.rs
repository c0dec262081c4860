mod common;

use common::*;
use irobot_core::device::display_list::{DisplayList, RenderMode};
use irobot_core::device::mathbox::fixed::Vector3;
use irobot_core::device::mathbox::{Mathbox, MathboxConfig};

const START_PLAYFIELD: u16 = 0x8400;
const TILES: u16 = 0x0E00;
const EMPTY: u16 = 0x8000;

/// One visible row (row 0) of empty tiles, camera at the origin.
fn playfield(config: MathboxConfig) -> Mathbox {
    let mut mb = Mathbox::new(config);
    write_matrix(&mut mb, 0x15, IDENTITY);
    for n in 0..32 * 16 {
        mb.memory_mut()[TILES as usize + n] = EMPTY;
    }
    // z_max = z_min = 0: a single row
    write_words(&mut mb, 0x6C, &[0, 0]);
    mb
}

fn set_tile(mb: &mut Mathbox, row: u16, index: u16, tile: u16) {
    mb.memory_mut()[(TILES + row * 16 + index) as usize] = tile;
}

fn colors(out: &DisplayList) -> Vec<u8> {
    out.iter().map(|(_, v)| v[0].color.r).collect()
}

fn quad(out: &DisplayList, n: usize) -> Vec<Vector3> {
    let (_, verts) = out.iter().nth(n).unwrap();
    verts.iter().map(|v| v.position).collect()
}

#[test]
fn test_empty_row_emits_nothing() {
    let mut mb = playfield(MathboxConfig::default());
    assert!(run_command(&mut mb, START_PLAYFIELD).is_empty());
}

#[test]
fn test_flat_tile_between_empty_neighbours() {
    let mut mb = playfield(MathboxConfig::default());
    // flat, height 0, color 7
    set_tile(&mut mb, 0, 5, 0x0047);

    let out = run_command(&mut mb, START_PLAYFIELD);
    // left side, front, top, bottom
    assert_eq!(colors(&out), vec![6, 5, 7, 7]);
    assert!(out.iter().all(|(m, v)| m == RenderMode::Polygon && v.len() == 4));

    // Tiles are drawn from x = 128 (tile 1) in 128-unit steps.
    let (x1, x2) = (640, 768);
    let v = Vector3::new;
    assert_eq!(quad(&out, 0), vec![v(x1, 0, 0), v(x1, 0, 128), v(x1, 256, 128), v(x1, 256, 0)]);
    assert_eq!(quad(&out, 1), vec![v(x1, 0, 0), v(x1, 256, 0), v(x2, 256, 0), v(x2, 0, 0)]);
    assert_eq!(quad(&out, 2), vec![v(x1, 0, 0), v(x2, 0, 0), v(x2, 0, 128), v(x1, 0, 128)]);
    assert_eq!(quad(&out, 3), vec![v(x1, 256, 0), v(x1, 256, 128), v(x2, 256, 128), v(x2, 256, 0)]);
}

#[test]
fn test_empty_neighbours_use_default_height() {
    let mut mb = playfield(MathboxConfig::default());
    // Camera 100 units up: the floor sits at 256 - 100.
    write_vector(&mut mb, 0x12, 0, 100, 0);
    set_tile(&mut mb, 0, 5, 0x0047);

    let out = run_command(&mut mb, START_PLAYFIELD);
    for (_, verts) in out.iter() {
        for v in verts {
            assert!(v.position.y == -100 || v.position.y == 156, "{:?}", v.position);
        }
    }
}

#[test]
fn test_tile_height_scales_by_four() {
    let mut mb = playfield(MathboxConfig::default());
    // height byte 0x10 -> 64 units
    set_tile(&mut mb, 0, 5, 0x1047);
    let out = run_command(&mut mb, START_PLAYFIELD);
    let top = quad(&out, 2);
    assert!(top.iter().all(|p| p.y == 64));
}

#[test]
fn test_sloped_tile_gets_vector_outline() {
    let mut mb = playfield(MathboxConfig::default());
    set_tile(&mut mb, 0, 5, 0x0007);
    let out = run_command(&mut mb, START_PLAYFIELD);
    let vectors = out.iter().filter(|(m, _)| *m == RenderMode::Vector).count();
    assert_eq!(vectors, 1);

    let mut mb = playfield(MathboxConfig {
        sloped_tile_outline: false,
        ..MathboxConfig::default()
    });
    set_tile(&mut mb, 0, 5, 0x0007);
    let out = run_command(&mut mb, START_PLAYFIELD);
    assert!(out.iter().all(|(m, _)| m == RenderMode::Polygon));
}

#[test]
fn test_render_mode_word() {
    for (word, mode) in [(0x0100, RenderMode::Vector), (0x0200, RenderMode::Dot)] {
        let mut mb = playfield(MathboxConfig::default());
        mb.memory_mut()[0x72] = word;
        set_tile(&mut mb, 0, 5, 0x0047);
        let out = run_command(&mut mb, START_PLAYFIELD);
        assert!(!out.is_empty());
        assert!(out.iter().all(|(m, _)| m == mode));
    }
}

#[test]
fn test_view_matrix_rotates_terrain() {
    let mut mb = playfield(MathboxConfig::default());
    write_matrix(&mut mb, 0x15, [-ONE, 0, 0, 0, ONE, 0, 0, 0, ONE]);
    set_tile(&mut mb, 0, 5, 0x0047);
    let out = run_command(&mut mb, START_PLAYFIELD);
    assert_eq!(quad(&out, 2)[0], Vector3::new(-640, 0, 0));
}

#[test]
fn test_raised_neighbour_hides_left_side() {
    let mut mb = playfield(MathboxConfig::default());
    set_tile(&mut mb, 0, 5, 0x0047);
    // Tile 4, to the left, is flat and higher (more negative y).
    set_tile(&mut mb, 0, 4, 0xF047);
    let out = run_command(&mut mb, START_PLAYFIELD);
    // Only the front and top of tile 5 start at (640, 0, 0); a left side
    // would make three.
    let from_corner = out
        .iter()
        .filter(|(_, v)| v[0].position == Vector3::new(640, 0, 0))
        .count();
    assert_eq!(from_corner, 2);
}

/// Flat tile holding an object, and a one-entry object list with a single
/// dot surface.
fn object_scene(config: MathboxConfig) -> Mathbox {
    let mut mb = playfield(config);
    set_tile(&mut mb, 0, 5, 0x00C7);

    write_words(&mut mb, 0x6B, &[0x0700]);
    write_words(&mut mb, 0x0700, &[0, 0x0100]);

    write_matrix(&mut mb, 0x0200, IDENTITY);
    write_vector(&mut mb, 0x0100, 0, 0, 1000);
    write_words(&mut mb, 0x0103, &[0, 0x15, 0x0200, 0x0300, 0]);
    write_words(&mut mb, 0x0300, &[0x0400, 0x0520, 0x0001, 0x8000]);
    write_words(&mut mb, 0x0520, &[0x4000, 0x8000]);
    write_vector(&mut mb, 0x0400, 7, 8, 9);
    mb
}

#[test]
fn test_row_objects_are_rasterized() {
    let mut mb = object_scene(MathboxConfig::default());
    let out = run_command(&mut mb, START_PLAYFIELD);
    let dots: Vec<_> = out
        .iter()
        .filter(|(m, _)| *m == RenderMode::Dot)
        .map(|(_, v)| v[0].position)
        .collect();
    assert_eq!(dots, vec![Vector3::new(7, 8, 1009)]);
}

#[test]
fn test_row_objects_can_be_disabled() {
    let mut mb = object_scene(MathboxConfig {
        terrain_objects: false,
        ..MathboxConfig::default()
    });
    let out = run_command(&mut mb, START_PLAYFIELD);
    assert!(!out.is_empty());
    assert!(out.iter().all(|(m, _)| m != RenderMode::Dot));
}

#[test]
fn test_rows_drawn_far_to_near() {
    let mut mb = playfield(MathboxConfig::default());
    // z_max = 1, z_min = 0: rows 1 then 0
    write_words(&mut mb, 0x6C, &[1, 0]);
    set_tile(&mut mb, 1, 5, 0x0041);
    set_tile(&mut mb, 0, 5, 0x0042);
    let out = run_command(&mut mb, START_PLAYFIELD);
    let order: Vec<_> = out
        .iter()
        .map(|(_, v)| (v[0].color.r, v[0].position.z))
        .collect();
    // Row 1: left, top, bottom (the level tile in front hides its front).
    // Row 0: left, front, top, bottom.
    assert_eq!(
        order,
        vec![(0, 128), (1, 128), (1, 128), (1, 0), (0, 0), (2, 0), (2, 0)]
    );
}
