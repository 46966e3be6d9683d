//! Single-threaded hosts for both sides of the payment channel, wired together through
//! an `InProcessBroker`. Each host owns its side's state and drains inbound frames when
//! asked; `InProcessBridge::pump` keeps going until neither side has anything left.

use tracing::{debug, error, info};

use payment_request_core::{
    ActorDestroyReason, ParentTransport, PaymentDetailsInit, PaymentError, PaymentMethodData,
    PaymentOptions, PaymentRequestHandle, PaymentRequestManager, PaymentRequestParent,
    PaymentRequestService, PaymentUiPort,
};

use crate::channel::{InProcessBroker, ParentPipe};
use crate::config::PaymentsConfig;

/// The page-facing side: the request registry and its child actor.
pub struct ContentProcess {
    config: PaymentsConfig,
    manager: PaymentRequestManager<InProcessBroker>,
}

impl ContentProcess {
    pub fn new(config: PaymentsConfig, broker: InProcessBroker) -> Self {
        let manager = PaymentRequestManager::new(broker, config.tab_id, config.release_idle_actor);
        Self { config, manager }
    }

    pub fn config(&self) -> &PaymentsConfig {
        &self.config
    }

    pub fn manager(&self) -> &PaymentRequestManager<InProcessBroker> {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut PaymentRequestManager<InProcessBroker> {
        &mut self.manager
    }

    /// `new PaymentRequest(...)` as seen by a page.
    pub fn construct(
        &mut self,
        method_data: &[PaymentMethodData],
        details: &PaymentDetailsInit,
        options: PaymentOptions,
    ) -> Result<String, PaymentError> {
        if !self.config.enabled {
            return Err(PaymentError::NotSupported(
                "PaymentRequest is not enabled".to_owned(),
            ));
        }
        self.manager.create_payment(method_data, details, options)
    }

    pub fn handle(
        &mut self,
        internal_id: &str,
    ) -> Result<PaymentRequestHandle<'_, InProcessBroker>, PaymentError> {
        self.manager.handle(internal_id)
    }

    /// Routes every frame waiting on the child pipe. A protocol failure, or the chrome
    /// side closing the pipe, tears the actor down and rejects what is outstanding.
    pub fn deliver_inbound(&mut self) -> Result<usize, PaymentError> {
        let (frames, closed) = match self.manager.child() {
            Some(child) if !child.is_destroyed() => {
                let mut frames = Vec::new();
                while let Some(frame) = child.transport().try_recv()? {
                    frames.push(frame);
                }
                (frames, child.transport().is_closed())
            }
            _ => return Ok(0),
        };

        let mut delivered = 0;
        for frame in frames {
            if let Err(e) = self.manager.recv_frame(&frame) {
                error!(tab = self.config.tab_id, error = %e, "payment channel failed");
                self.manager.actor_destroyed(ActorDestroyReason::AbnormalShutdown);
                return Ok(delivered);
            }
            delivered += 1;
        }
        if closed {
            info!(tab = self.config.tab_id, "payment channel closed by the chrome side");
            self.manager.actor_destroyed(ActorDestroyReason::AbnormalShutdown);
        }
        Ok(delivered)
    }

    /// The content process went away without saying goodbye.
    pub fn crash(&mut self) {
        self.manager.actor_destroyed(ActorDestroyReason::AbnormalShutdown);
    }
}

/// The privileged side: the service, its UI and one parent actor per open channel.
pub struct ChromeProcess<U: PaymentUiPort> {
    broker: InProcessBroker,
    service: PaymentRequestService<U>,
    actors: Vec<PaymentRequestParent<ParentPipe>>,
}

impl<U: PaymentUiPort> ChromeProcess<U> {
    pub fn new(broker: InProcessBroker, ui: U) -> Self {
        Self {
            broker,
            service: PaymentRequestService::new(ui),
            actors: Vec::new(),
        }
    }

    pub fn service(&self) -> &PaymentRequestService<U> {
        &self.service
    }

    pub fn service_mut(&mut self) -> &mut PaymentRequestService<U> {
        &mut self.service
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    /// Accepts new channels and feeds every waiting frame to the service. A channel whose
    /// frames fail, or whose pipe closed, loses its actor; records it owned are purged.
    pub fn deliver_inbound(&mut self) -> Result<usize, PaymentError> {
        for pipe in self.broker.accept()? {
            info!(channel = pipe.channel_id(), "payment parent actor created");
            self.actors.push(PaymentRequestParent::new(pipe));
        }

        let mut delivered = 0;
        for actor in &self.actors {
            while !actor.is_destroyed() {
                let Some(frame) = actor.transport().try_recv()? else {
                    break;
                };
                match actor.recv_frame(&mut self.service, &frame) {
                    Ok(()) => delivered += 1,
                    Err(e) => {
                        error!(channel = actor.channel_id(), error = %e, "payment channel failed");
                        actor.actor_destroy(ActorDestroyReason::AbnormalShutdown);
                    }
                }
            }
            if !actor.is_destroyed() && actor.transport().is_closed() {
                actor.actor_destroy(ActorDestroyReason::AbnormalShutdown);
            }
        }

        self.actors.retain(|actor| !actor.is_destroyed());
        let purged = self.service.purge_dead();
        if purged > 0 {
            debug!(purged, "orphaned payment requests dropped");
        }
        Ok(delivered)
    }

    /// Runs every UI answer queued so far.
    pub fn run_tasks(&mut self) -> usize {
        self.service.run_until_idle()
    }

    /// Waits for the next UI answer and runs it. Returns false once the sequence is gone.
    pub async fn run_next_task(&mut self) -> bool {
        match self.service.next_task().await {
            Some(task) => {
                if let Err(e) = self.service.run_task(task) {
                    debug!(error = %e, "payment service task failed");
                }
                true
            }
            None => false,
        }
    }

    /// Shuts every channel down from the privileged side.
    pub fn destroy_actors(&mut self) {
        for actor in self.actors.drain(..) {
            actor.actor_destroy(ActorDestroyReason::NormalShutdown);
        }
        self.service.purge_dead();
    }
}

/// Both processes in one place.
pub struct InProcessBridge<U: PaymentUiPort> {
    content: ContentProcess,
    chrome: ChromeProcess<U>,
}

impl<U: PaymentUiPort> InProcessBridge<U> {
    pub fn new(config: PaymentsConfig, ui: U) -> Self {
        let broker = InProcessBroker::default();
        Self {
            content: ContentProcess::new(config, broker.clone()),
            chrome: ChromeProcess::new(broker, ui),
        }
    }

    pub fn content(&self) -> &ContentProcess {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut ContentProcess {
        &mut self.content
    }

    pub fn chrome(&self) -> &ChromeProcess<U> {
        &self.chrome
    }

    pub fn chrome_mut(&mut self) -> &mut ChromeProcess<U> {
        &mut self.chrome
    }

    /// Moves frames and UI answers back and forth until both sides are quiet.
    pub fn pump(&mut self) -> Result<usize, PaymentError> {
        let mut total = 0;
        loop {
            let moved = self.chrome.deliver_inbound()?
                + self.chrome.run_tasks()
                + self.content.deliver_inbound()?;
            if moved == 0 {
                return Ok(total);
            }
            total += moved;
        }
    }
}
