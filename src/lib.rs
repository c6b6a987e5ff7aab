//! Load WebAssembly plugins into isolated contexts that can be torn down independently
//! of the host.
//!
//! The host never tells a context where code comes from. Instead it supplies a
//! [`CodeResolver`], and every time a context needs a unit it does not have yet (the
//! plugin itself or any unit that plugin imports from), the request is routed back to
//! that resolver. The result of a load is a [`PluginHandle`], which owns the context
//! and disposes of it exactly once.
//!
//! # Core Concepts
//!
//! - **Unit**: a WebAssembly module identified by a [`UnitName`]. Its raw bytes (a
//! 	[`CodeImage`]) come from the resolver. The module names a unit imports from are
//! 	the units it depends on; they are resolved the same way, transitively.
//!
//! - [`IsolatedContext`]: a wasmtime store with its own linker. Everything loaded into
//! 	it shares its lifetime; unloading the context destroys all of it at once.
//!
//! - [`Proxy`]: a host-side reference to an object living in a context. Calls marshal
//! 	plain [`Value`]s across the boundary and fail with a [`BoundaryError`] once the
//! 	context is gone. Implement [`PluginProxy`] to give a plugin a typed API.
//!
//! - [`PluginLoader`]: creates a context per load, installs a resolver bridge wired to
//! 	its resolver, and constructs the requested type inside the context.
//!
//! # Object ABI
//!
//! A unit defines a type `T` through its exports:
//! - `"T#new"`: constructor, `() -> i32`, returning a handle identifying the object
//! - `"T#<method>"`: a method; the object handle is passed as the first parameter
//! - `"T#dispose"`: optional disposal capability, `(i32) -> ()`
//!
//! Methods returning a string return an `(i32, i32)` pointer/length pair into the
//! unit's exported `"memory"`, read with [`Proxy::call_string`].
//!
//! # Example
//!
//! ```
//! use wasm_isolate::{ CallError, Engine, MemoryResolver, PluginLoader, PluginProxy, Proxy };
//!
//! // A typed view of the plugin object
//! struct Greeter( Proxy );
//!
//! impl PluginProxy for Greeter {
//! 	fn from_proxy( proxy: Proxy ) -> Self { Self( proxy ) }
//! 	fn proxy( &self ) -> &Proxy { &self.0 }
//! }
//!
//! impl Greeter {
//! 	fn greet( &self ) -> Result<String, CallError> { self.0.call_string( "Greet", &[] ) }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Any `CodeResolver` works; `FileResolver` reads `<root>/<unit>.wasm` instead.
//! let resolver = MemoryResolver::new().with_unit( "MyPlugin", r#"(module
//! 	(memory (export "memory") 1)
//! 	(data (i32.const 16) "hello")
//! 	(func (export "MyPlugin.Greeter#new") (result i32) i32.const 1)
//! 	(func (export "MyPlugin.Greeter#Greet") (param i32) (result i32 i32)
//! 		i32.const 16
//! 		i32.const 5)
//! )"# );
//!
//! let loader = PluginLoader::new( &Engine::default(), resolver );
//! let plugin = loader.load::<Greeter>( "MyPlugin", "MyPlugin.Greeter" )?;
//! assert_eq!( plugin.instance()?.greet()?, "hello" );
//!
//! // Disposing tears the context down; the instance is no longer reachable.
//! plugin.dispose()?;
//! assert!( plugin.instance().is_err() );
//! assert_eq!( loader.live_contexts(), 0 );
//! # Ok(())
//! # }
//! ```
//!
//! # Dependencies and Host Functions
//!
//! A unit importing `(import "MathLib" "add" ...)` makes the context resolve `MathLib`
//! before the importing unit is instantiated. Imports already satisfied by the loader's
//! [`Linker`] are host functions and never reach the resolver.
//!
//! ```
//! use wasm_isolate::{ ContextData, Engine, Linker, MemoryResolver, PluginLoader, Proxy, Value };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Engine::default();
//! let mut linker = Linker::<ContextData>::new( &engine );
//! linker.func_wrap( "host", "double", | x: i32 | x * 2 )?;
//!
//! let resolver = MemoryResolver::new()
//! 	.with_unit( "MathLib", r#"(module
//! 		(import "host" "double" (func $double (param i32) (result i32)))
//! 		(func (export "add_doubled") (param i32 i32) (result i32)
//! 			(call $double (i32.add (local.get 0) (local.get 1))))
//! 	)"# )
//! 	.with_unit( "Calculator", r#"(module
//! 		(import "MathLib" "add_doubled" (func $add (param i32 i32) (result i32)))
//! 		(func (export "Calc#new") (result i32) i32.const 0)
//! 		(func (export "Calc#Compute") (param i32 i32 i32) (result i32)
//! 			(call $add (local.get 1) (local.get 2)))
//! 	)"# );
//!
//! let loader = PluginLoader::new( &engine, resolver ).with_linker( linker );
//! let calc = loader.load::<Proxy>( "Calculator", "Calc" )?;
//! let result = calc.instance()?.call( "Compute", &[ Value::I32( 2 ), Value::I32( 3 )])?;
//! assert_eq!( result, vec![ Value::I32( 10 )]);
//! # Ok(())
//! # }
//! ```
//!
//! # Re-exports
//!
//! `wasm_isolate` re-exports [`Engine`] and [`Linker`] from `wasmtime` for convenience.
//! See the [wasmtime docs](https://docs.rs/wasmtime/latest/wasmtime/) for details.

mod abi ;
mod bridge ;
mod context ;
mod file_resolver ;
mod handle ;
mod loader ;
mod proxy ;
mod resolver ;
mod unit ;

#[doc( no_inline )]
pub use wasmtime::{ Engine, Linker };

pub use unit::{ UnitName, TypeName, CodeImage };
pub use resolver::{ CodeResolver, ResolveError, MemoryResolver };
pub use file_resolver::{ FileResolver, DEFAULT_EXTENSION };
pub use context::{ IsolatedContext, ContextId, ContextData, ContextError };
pub use proxy::{ Proxy, PluginProxy, Value, CallError, BoundaryError };
pub use handle::{ PluginHandle, DisposeError, UseAfterDispose };
pub use loader::{ PluginLoader, LoadError };
