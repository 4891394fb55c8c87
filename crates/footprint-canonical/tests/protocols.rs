use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use footprint_canonical::{
    decode, decode_as, decode_value, encode, DecodeError, Decoded, Encodable,
    EncodeError, KeyProtocol, NamedSequence, NdArray, NonKey, Reconstruct, Registry, Resolver,
    StateProtocol, TypePath, Value,
};

#[derive(Debug, Clone, PartialEq)]
struct Point {
    x: i64,
    y: i64,
}

impl StateProtocol for Point {
    fn type_path(&self) -> TypePath {
        <Self as Reconstruct>::type_path()
    }

    fn state(&self, _resolver: &mut Resolver) -> Result<Value, EncodeError> {
        Ok(NamedSequence::new("Point")
            .field("x", self.x)
            .field("y", self.y)
            .into())
    }
}

impl Reconstruct for Point {
    fn type_path() -> TypePath {
        TypePath::new("geometry", "Point")
    }

    fn from_state(state: Value, _registry: &Registry) -> Result<Self, DecodeError> {
        let mut record: NamedSequence = state.extract()?;
        Ok(Point {
            x: record.take("x")?,
            y: record.take("y")?,
        })
    }
}

impl Encodable for Point {
    fn as_stateful(&self) -> Option<&dyn StateProtocol> {
        Some(self)
    }
}

#[derive(Debug, PartialEq)]
struct Segment {
    from: Point,
    to: Point,
}

impl StateProtocol for Segment {
    fn type_path(&self) -> TypePath {
        <Self as Reconstruct>::type_path()
    }

    fn state(&self, resolver: &mut Resolver) -> Result<Value, EncodeError> {
        Ok(Value::seq([resolver.resolve(&self.from)?, resolver.resolve(&self.to)?]))
    }
}

impl Reconstruct for Segment {
    fn type_path() -> TypePath {
        TypePath::new("geometry", "Segment")
    }

    fn from_state(state: Value, registry: &Registry) -> Result<Self, DecodeError> {
        let (from, to): (Value, Value) = state.extract()?;
        Ok(Segment {
            from: registry.reconstruct(from)?,
            to: registry.reconstruct(to)?,
        })
    }
}

impl Encodable for Segment {
    fn as_stateful(&self) -> Option<&dyn StateProtocol> {
        Some(self)
    }
}

struct Tag(&'static str);

impl KeyProtocol for Tag {
    fn type_path(&self) -> TypePath {
        TypePath::new("geometry", "Point")
    }

    fn footprint_key(&self, _resolver: &mut Resolver) -> Result<Value, EncodeError> {
        Ok(Value::from(self.0))
    }
}

impl Encodable for Tag {
    fn as_keyed(&self) -> Option<&dyn KeyProtocol> {
        Some(self)
    }
}

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry.register::<Point>().register::<Segment>();
    registry
}

#[test]
fn state_objects_round_trip_through_the_registry() {
    let segment = Segment {
        from: Point { x: 0, y: 0 },
        to: Point { x: 3, y: -4 },
    };
    let bytes = encode(&segment).unwrap();
    let back: Segment = decode_as(&bytes, &registry()).unwrap();
    assert_eq!(back, segment);
}

#[test]
fn objects_inside_containers_are_rebuilt_in_place() {
    let points = vec![Point { x: 1, y: 2 }, Point { x: 5, y: 6 }];
    let bytes = encode(&points).unwrap();
    let Decoded::Sequence(items) = decode(&bytes, &registry()).unwrap() else {
        panic!("expected a sequence");
    };
    let rebuilt: Vec<Point> = items
        .into_iter()
        .map(|item| item.into_object::<Point>().unwrap())
        .collect();
    assert_eq!(rebuilt, points);
}

#[test]
fn keyed_objects_are_never_reconstructed() {
    // the registry knows geometry::Point, but keyed frames stay literal
    let bytes = encode(&Tag("origin")).unwrap();
    let decoded = decode(&bytes, &registry()).unwrap();
    match decoded.into_value().unwrap() {
        Value::KeyedObject(frame) => {
            assert_eq!(frame.path, TypePath::new("geometry", "Point"));
            assert_eq!(*frame.payload, Value::from("origin"));
        }
        other => panic!("expected keyed object, got {other}"),
    }
}

#[test]
fn missing_registration_is_unknown_type() {
    let bytes = encode(&Point { x: 1, y: 1 }).unwrap();
    let err = decode(&bytes, &Registry::new()).unwrap_err();
    assert!(matches!(err, DecodeError::UnknownType(path) if path.name == "Point"));
}

#[test]
fn literal_decoding_needs_no_registry() {
    let bytes = encode(&Point { x: 1, y: 1 }).unwrap();
    let value = decode_value(&bytes).unwrap();
    assert_eq!(value.kind(), "object");
}

fn reject(_state: Value, _registry: &Registry) -> Result<Box<dyn Any>, DecodeError> {
    Err(DecodeError::Extract("bad point".into()))
}

#[test]
fn rejected_state_is_reported() {
    let mut registry = Registry::new();
    registry.register_fn(TypePath::new("geometry", "Point"), reject);
    let bytes = encode(&Point { x: 1, y: 1 }).unwrap();
    assert!(matches!(
        decode(&bytes, &registry),
        Err(DecodeError::Extract(reason)) if reason == "bad point"
    ));
}

#[test]
fn wrong_target_type_is_a_state_error() {
    let bytes = encode(&Point { x: 1, y: 1 }).unwrap();
    let err = decode_as::<Segment>(&bytes, &registry()).unwrap_err();
    assert!(matches!(err, DecodeError::State { .. }));
}

#[test]
fn self_referencing_structures_are_rejected() {
    struct Cell {
        next: Option<Rc<RefCell<Cell>>>,
    }

    impl Encodable for Cell {
        fn to_value(&self, resolver: &mut Resolver) -> Result<Value, EncodeError> {
            resolver.resolve(&self.next)
        }
    }

    let cell = Rc::new(RefCell::new(Cell { next: None }));
    cell.borrow_mut().next = Some(cell.clone());
    let err = encode(&cell).unwrap_err();
    assert!(matches!(err, EncodeError::CyclicReference(_)));
    // break the cycle so the test does not leak
    cell.borrow_mut().next = None;
}

#[test]
fn array_failures_surface_as_encode_errors() {
    struct Matrix {
        rows: u64,
        cols: u64,
        values: Vec<f64>,
    }

    impl Encodable for Matrix {
        fn to_value(&self, _resolver: &mut Resolver) -> Result<Value, EncodeError> {
            Ok(NdArray::from_f64(vec![self.rows, self.cols], &self.values)?.into())
        }
    }

    let good = Matrix {
        rows: 1,
        cols: 2,
        values: vec![1.0, 2.0],
    };
    assert!(encode(&good).is_ok());

    let bad = Matrix {
        rows: 2,
        cols: 2,
        values: vec![1.0],
    };
    assert!(matches!(encode(&bad), Err(EncodeError::Array(_))));
}

mod v1 {
    use footprint_canonical::parameter;

    parameter! {
        module = "simulation";
        #[derive(Debug, Clone)]
        pub struct Run {
            pub steps: i64,
            pub dt: f64,
        }
    }
}

mod v2 {
    use footprint_canonical::parameter;

    parameter! {
        module = "simulation";
        #[derive(Debug, Clone)]
        pub struct Run {
            pub steps: i64,
            pub dt: f64,
            pub damping: Option<f64>,
        }
    }
}

#[test]
fn adding_an_optional_parameter_keeps_old_footprints() {
    let old = v1::Run {
        steps: 100,
        dt: 0.01,
        non_key: NonKey::new(),
    };
    let new = v2::Run {
        steps: 100,
        dt: 0.01,
        damping: None,
        non_key: NonKey::new(),
    };
    assert_eq!(encode(&old).unwrap(), encode(&new).unwrap());

    let damped = v2::Run {
        damping: Some(0.5),
        ..new.clone()
    };
    assert_ne!(encode(&damped).unwrap(), encode(&new).unwrap());
}

#[test]
fn parameters_are_keyed_not_reconstructed() {
    let run = v1::Run {
        steps: 1,
        dt: 0.5,
        non_key: NonKey::new(),
    }
    .with_info("note", "smoke");
    let bytes = encode(&run).unwrap();
    let value = decode(&bytes, &Registry::new()).unwrap().into_value().unwrap();
    assert_eq!(value.kind(), "keyed object");
    assert_eq!(
        run.to_string(),
        "   dt : 0.5\nsteps : 1\n--- extra info ---\nnote : smoke"
    );
}
