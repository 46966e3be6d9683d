pub mod actor;
pub mod domain;
pub mod manager;
pub mod ports;
pub mod promise;
pub mod record;
pub mod request;
pub mod sequence;
pub mod service;
pub mod state_machine;
pub mod validation;
pub mod wire;

pub use actor::{ActorDestroyReason, PaymentRequestChild, PaymentRequestParent};
pub use domain::{
    PaymentAddress, PaymentComplete, PaymentCurrencyAmount, PaymentDetailsInit,
    PaymentDetailsModifier, PaymentDetailsUpdate, PaymentItem, PaymentMethodData,
    PaymentOptions, PaymentShippingOption, PaymentShippingType,
};
pub use manager::{PaymentRequestHandle, PaymentRequestManager};
pub use ports::{
    ChildConnector, ChildTransport, ParentTransport, PaymentDispatch, PaymentError,
    PaymentUiPort, ResponseCallback, ResponseSink,
};
pub use promise::{Promise, PromiseState, Resolver};
pub use record::{
    AbortStatus, AcceptStatus, ActionKind, PaymentActionRequest, PaymentDetails,
    ServiceAction, ServicePaymentRequest, ServiceResponse,
};
pub use request::{
    PaymentRequest, PaymentRequestUpdateEvent, PaymentResponse, ShowResult, UpdateEventType,
};
pub use sequence::{Sequence, SequenceSender};
pub use service::{PaymentRequestService, ServiceTask, UiReply};
pub use state_machine::{request_transition, RequestAction, RequestState, StateTransition};
pub use wire::{ActionRequest, ActionResponse, ChangeNotification, ChildMessage, ParentMessage};
