use posix_model::{Fd, Pid, PosixModel};

/// A syscall as a tracer would report it.
enum Call {
    Chdir(&'static str),
    Mkdir(&'static str),
    Symlink(&'static str, &'static str),
    Opendir(&'static str, Fd),
    Fork(Pid),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let trace: [(Pid, Call); 8] = [
        // the shell starts in a directory the model has never seen
        (100, Call::Chdir("/home/user/project")),
        (100, Call::Mkdir("build")),
        (100, Call::Symlink("build", "out")),
        (100, Call::Mkdir("out/objects")),
        // the compiler is forked and works through the link
        (100, Call::Fork(101)),
        (101, Call::Chdir("out/objects")),
        (101, Call::Opendir("..", 3)),
        (100, Call::Chdir("/tmp")),
    ];

    let mut model = PosixModel::new();
    for (pid, call) in trace {
        // every path of a traced call is relative to the caller's cwd
        let cwd = model.cwd(pid);
        match call {
            Call::Chdir(path) => model.chdir(cwd, path, pid)?,
            Call::Mkdir(path) => {
                model.mkdir(cwd, path)?;
            }
            Call::Symlink(target, path) => {
                model.symlink(cwd, target, path)?;
            }
            Call::Opendir(path, fd) => model.opendir(cwd, path, pid, fd)?,
            Call::Fork(child) => model.fork(pid, child)?,
        }
    }

    for pid in [100, 101] {
        let cwd = model.cwd(pid);
        println!("{pid}: cwd -> {}", model.realpath(cwd).display());
    }
    if let Some(dir) = model.lookup_fd(101, 3) {
        println!("101: 3 -> {}", model.realpath(dir).display());
        for entry in model.readdir(101, 3)? {
            println!("    {} ({})", entry.name().to_string_lossy(), entry.kind().as_str());
        }
    }

    println!("{model:?}");
    Ok(())
}
