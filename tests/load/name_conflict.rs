use std::sync::Arc ;
use std::sync::atomic::{ AtomicUsize, Ordering };
use wasm_isolate::{ LoadError, Linker, Proxy };
use crate::fixtures ;

fn counting_linker( starts: &Arc<AtomicUsize> ) -> Linker<wasm_isolate::ContextData> {
	let mut linker = Linker::new( &fixtures::ENGINE );
	let counter = Arc::clone( starts );
	linker.func_wrap( "host", "started", move || { counter.fetch_add( 1, Ordering::SeqCst ); }).unwrap();
	linker
}

#[test]
fn conflicting_unit_is_rejected_before_it_starts() {

	let starts = Arc::new( AtomicUsize::new( 0 ));
	let mut linker = counting_linker( &starts );
	linker.func_wrap( "Counted", "Counted.T#new", || 42_i32 ).unwrap();
	let loader = fixtures::loader().with_linker( linker );

	match loader.load::<Proxy>( "Counted", "Counted.T" ) {
		Err( LoadError::NameConflict { unit, export })
			if unit.as_str() == "Counted" && export == "Counted.T#new" => {},
		Err( err ) => panic!( "Unexpected error: {}", err ),
		Ok( _ ) => panic!( "Expected failure" ),
	}

	assert_eq!( starts.load( Ordering::SeqCst ), 0 );
	assert_eq!( loader.live_contexts(), 0 );

}

#[test]
fn start_function_runs_once_per_context() {

	let starts = Arc::new( AtomicUsize::new( 0 ));
	let loader = fixtures::loader().with_linker( counting_linker( &starts ));

	let counted = loader.load::<Proxy>( "Counted", "Counted.T" ).unwrap();
	counted.context().load_unit( &fixtures::unit( "Counted" )).unwrap();
	counted.context()
		.create_instance::<Proxy>( &fixtures::unit( "Counted" ), &fixtures::type_name( "Counted.T" ))
		.unwrap();

	assert_eq!( starts.load( Ordering::SeqCst ), 1 );

}
