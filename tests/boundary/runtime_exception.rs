use wasm_isolate::{ CallError, Proxy, Value };
use crate::fixtures ;

#[test]
fn trap_is_reported_separately() {

	let loader = fixtures::loader();
	let numbers = loader.load::<Proxy>( "Odd", "Odd.Numbers" ).unwrap();
	let numbers = numbers.instance().unwrap();

	match numbers.call( "Fail", &[] ) {
		Err( err @ CallError::Trap( _ )) => assert!( !err.is_boundary() ),
		other => panic!( "Unexpected result: {:?}", other ),
	}

	// A trap doesn't take the context down
	assert_eq!(
		numbers.call( "Scale", &[ Value::I64( 1 ), Value::F64( 1.0 )]).unwrap(),
		vec![ Value::I64( 3 ), Value::F64( 0.5 )],
	);

}
