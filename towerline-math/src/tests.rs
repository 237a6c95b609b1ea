use strum::IntoEnumIterator;

use crate::{GeoArc, GeoPos, GeoRect, Heading, Length, Quadrant, Speed, normalize_periodic};

fn assert_close(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() <= epsilon,
        "expected {expected} \u{b1} {epsilon}, got {actual}"
    );
}

#[test]
fn normalize_periodic_wraps() {
    assert_close(normalize_periodic(0., 360., 370.), 10., 1e-9);
    assert_close(normalize_periodic(0., 360., -10.), 350., 1e-9);
    assert_close(normalize_periodic(-180., 180., 180.), -180., 1e-9);
}

#[test]
fn heading_closest_distance() {
    assert_close(Heading::from_degrees(350.).closest_distance(Heading::from_degrees(10.)), 20., 1e-9);
    assert_close(Heading::from_degrees(10.).closest_distance(Heading::from_degrees(350.)), -20., 1e-9);
    assert_close(Heading::NORTH.closest_distance(Heading::SOUTH), 180., 1e-9);
}

#[test]
fn heading_is_within_is_strict() {
    assert!(Heading::from_degrees(80.).is_within(Heading::EAST, 10.1));
    assert!(!Heading::from_degrees(80.).is_within(Heading::EAST, 10.));
}

#[test]
fn heading_display_pads() {
    assert_eq!(Heading::from_degrees(5.4).to_string(), "005");
    assert_eq!(Heading::from_degrees(359.6).to_string(), "000");
    assert_eq!(Heading::from_degrees(-90.).to_string(), "270");
}

#[test]
fn distance_one_degree_latitude() {
    let a = GeoPos::new(0., 0.);
    let b = GeoPos::new(1., 0.);
    assert_close(a.distance(b).into_meters(), 111_195., 10.);
}

#[test]
fn course_cardinal() {
    let origin = GeoPos::new(45., 7.);
    assert_close(origin.course_to(GeoPos::new(45.01, 7.)).degrees(), 0., 1e-6);
    assert_close(origin.course_to(GeoPos::new(44.99, 7.)).degrees(), 180., 1e-6);
    assert!(origin.course_to(GeoPos::new(45., 7.01)).is_within(Heading::EAST, 0.01));
    assert!(origin.course_to(GeoPos::new(45., 6.99)).is_within(Heading::WEST, 0.01));
}

#[test]
fn destination_matches_distance_and_course() {
    let origin = GeoPos::new(51.47, -0.45);
    let course = Heading::from_degrees(63.);
    let target = origin.destination(course, Length::from_meters(1500.));
    assert_close(origin.distance(target).into_meters(), 1500., 0.01);
    assert!(origin.course_to(target).is_within(course, 0.01));
}

#[test]
fn cart_inverse() {
    let pos = GeoPos::new(-33.94, 151.18);
    let back = GeoPos::from_cart(pos.to_cart());
    assert_close(back.lat, pos.lat, 1e-7);
    assert_close(back.lon, pos.lon, 1e-7);
}

#[test]
fn arc_contains_midpoint() {
    let arc = GeoArc::new(GeoPos::new(10., 10.), GeoPos::new(10., 10.02));
    let mid = arc.start.destination(arc.course(), arc.length() / 2.);
    assert!(arc.contains(mid, Length::from_meters(0.5)));
    assert!(!arc.contains(GeoPos::new(10.01, 10.01), Length::from_meters(0.5)));
    assert!(!arc.contains(GeoPos::new(10., 10.05), Length::from_meters(0.5)));
}

#[test]
fn arcs_crossing() {
    let east_west = GeoArc::new(GeoPos::new(0., -0.01), GeoPos::new(0., 0.01));
    let north_south = GeoArc::new(GeoPos::new(-0.01, 0.), GeoPos::new(0.01, 0.));
    let point = east_west.arc_intersection(&north_south, Length::from_meters(0.5)).expect("arcs cross at origin");
    assert!(point.distance(GeoPos::new(0., 0.)).into_meters() < 0.01);
}

#[test]
fn arcs_not_reaching() {
    let east_west = GeoArc::new(GeoPos::new(0., -0.01), GeoPos::new(0., 0.01));
    let north_south = GeoArc::new(GeoPos::new(0.001, 0.), GeoPos::new(0.01, 0.));
    assert!(east_west.circle_intersection(&north_south).is_some());
    assert_eq!(east_west.arc_intersection(&north_south, Length::from_meters(0.5)), None);
}

#[test]
fn parallel_arcs_on_same_circle() {
    let a = GeoArc::new(GeoPos::new(0., 0.), GeoPos::new(0., 0.01));
    let b = GeoArc::new(GeoPos::new(0., 0.02), GeoPos::new(0., 0.03));
    assert_eq!(a.circle_intersection(&b), None);
}

#[test]
fn rect_quadrants_partition() {
    let rect = GeoRect::around(GeoPos::new(0., 0.), 1.);
    for quadrant in Quadrant::iter() {
        let child = rect.quadrant(quadrant);
        let center = child.center();
        assert_eq!(rect.quadrant_of(center), Some(quadrant));
        assert!(rect.contains(center));
    }
    assert_eq!(rect.quadrant_of(GeoPos::new(0., 0.5)), None);
    assert_eq!(rect.quadrant_of(GeoPos::new(0.5, 0.)), None);
}

#[test]
fn rect_overlap_touching_edges() {
    let a = GeoRect::new(GeoPos::new(0., 0.), GeoPos::new(1., 1.));
    let b = GeoRect::new(GeoPos::new(1., 1.), GeoPos::new(2., 2.));
    let c = GeoRect::new(GeoPos::new(1.5, 1.5), GeoPos::new(2., 2.));
    assert!(a.overlaps(&b));
    assert!(!a.overlaps(&c));
}

#[test]
fn rect_enclosing() {
    let rect = GeoRect::enclosing([GeoPos::new(1., 2.), GeoPos::new(-1., 3.)], 0.5)
        .expect("points are nonempty");
    assert_eq!(rect.min, GeoPos::new(-1.5, 1.5));
    assert_eq!(rect.max, GeoPos::new(1.5, 3.5));
    assert_eq!(GeoRect::enclosing([], 0.), None);
}

#[test]
fn travel_time_zero_speed() {
    assert_eq!(Length::from_meters(100.).try_div(Speed::ZERO), None);
    let time = Length::from_nm(1.).try_div(Speed::from_knots(60.)).expect("positive speed");
    assert_close(time.as_secs_f64(), 60., 1e-9);
}

#[test]
fn length_conversions() {
    assert_close(Length::from_nm(1.).into_meters(), 1852., 1e-9);
    assert_close(Length::from_feet(1000.).into_meters(), 304.8, 0.01);
    assert_close(Speed::from_knots(1.).into_meter_per_sec(), 0.514_444, 1e-6);
    assert!(Length::from_feet(100.) < Length::from_meters(100.));
}

#[test]
fn quantity_rejects_non_finite() {
    let mut buf = Vec::new();
    ciborium::into_writer(&1852.5_f64, &mut buf).expect("encode finite");
    let length: Length<f64> = ciborium::from_reader(buf.as_slice()).expect("finite length");
    assert_close(length.into_meters(), 1852.5, 1e-9);

    buf.clear();
    ciborium::into_writer(&f64::INFINITY, &mut buf).expect("encode infinity");
    assert!(ciborium::from_reader::<Length<f64>, _>(buf.as_slice()).is_err());
}
