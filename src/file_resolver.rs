use std::path::{ Component, Path, PathBuf };
use pipe_trait::Pipe ;

use crate::{ CodeImage, CodeResolver, ResolveError, UnitName };



/// Extension used by [`FileResolver`] unless configured otherwise.
pub const DEFAULT_EXTENSION: &str = "wasm" ;

/// Resolves units from files named `<unit>.<extension>` inside a root directory.
///
/// ```no_run
/// use wasm_isolate::FileResolver ;
///
/// // Reads `plugins/MyPlugin.wasm` when `MyPlugin` is requested
/// let resolver = FileResolver::new( "plugins" );
///
/// // Text-format modules work too
/// let resolver = FileResolver::new( "plugins" ).with_extension( "wat" );
/// ```
#[derive( Debug, Clone )]
pub struct FileResolver {
	root: PathBuf,
	extension: String,
}

impl FileResolver {

	pub fn new( root: impl Into<PathBuf> ) -> Self {
		Self { root: root.into(), extension: DEFAULT_EXTENSION.to_string() }
	}

	/// Changes the file extension appended to unit names.
	pub fn with_extension( mut self, extension: impl Into<String> ) -> Self {
		self.extension = extension.into();
		self
	}

	#[inline] pub fn root( &self ) -> &Path { &self.root }

	#[inline] pub fn extension( &self ) -> &str { &self.extension }

	/// The file a unit resolves to, or `None` if the name would leave the root directory.
	pub fn path_of( &self, name: &UnitName ) -> Option<PathBuf> {
		let mut components = Path::new( name.as_str() ).components();
		match ( components.next(), components.next() ) {
			( Some( Component::Normal( _ )), None ) => Some( self.root.join( format!( "{}.{}", name, self.extension ))),
			_ => None,
		}
	}

}

/// Resolves relative to the process's current directory.
impl Default for FileResolver {
	fn default() -> Self {
		std::env::current_dir()
			.unwrap_or_else(|_| PathBuf::from( "." ))
			.pipe( Self::new )
	}
}

impl CodeResolver for FileResolver {
	fn resolve( &self, name: &UnitName ) -> Result<CodeImage, ResolveError> {
		let path = self.path_of( name ).ok_or_else(|| ResolveError::NotFound( name.clone() ))?;
		tracing::trace!( unit = %name, path = %path.display(), "Reading unit image" );
		match std::fs::read( &path ) {
			Ok( bytes ) => Ok( bytes.into() ),
			Err( err ) if err.kind() == std::io::ErrorKind::NotFound => Err( ResolveError::NotFound( name.clone() )),
			Err( source ) => Err( ResolveError::Io { unit: name.clone(), source }),
		}
	}
}



#[cfg( test )]
mod tests {

	use super::* ;

	fn unit( name: &str ) -> UnitName { UnitName::new( name ).expect( "valid unit name" ) }

	#[test]
	fn appends_the_extension() {
		let resolver = FileResolver::new( "/plugins" ).with_extension( "wat" );
		assert_eq!( resolver.path_of( &unit( "MyPlugin" )), Some( PathBuf::from( "/plugins/MyPlugin.wat" )));
	}

	#[test]
	fn rejects_names_leaving_the_root() {
		let resolver = FileResolver::new( "/plugins" );
		assert_eq!( resolver.path_of( &unit( "../secret" )), None );
		assert_eq!( resolver.path_of( &unit( "nested/unit" )), None );
		assert_eq!( resolver.path_of( &unit( ".." )), None );
		assert!( matches!( resolver.resolve( &unit( "../secret" )), Err( ResolveError::NotFound( _ ))));
	}

	#[test]
	fn defaults_to_the_current_directory() {
		let resolver = FileResolver::default();
		assert_eq!( resolver.root(), std::env::current_dir().expect( "current dir" ));
		assert_eq!( resolver.extension(), DEFAULT_EXTENSION );
	}

}
